//! Emits the Cluster CRD manifest for `kubectl apply`.

use crds::Cluster;
use kube::CustomResourceExt;

fn main() {
    match serde_yaml::to_string(&Cluster::crd()) {
        Ok(manifest) => print!("{manifest}"),
        Err(e) => {
            eprintln!("failed to render Cluster CRD: {e}");
            std::process::exit(1);
        }
    }
}
