// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Print the CustomResourceDefinitions served by the operator as a YAML stream.

use dockyard::types::{HttpsCert, OperatorConfig, Registry};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [Registry::crd(), OperatorConfig::crd(), HttpsCert::crd()];

    for crd in crds {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
