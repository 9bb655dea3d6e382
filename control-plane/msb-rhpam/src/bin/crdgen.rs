use kube::core::CustomResourceExt;
use msb_rhpam::crd::{RhpamDev, RhpamUser};

fn main() -> anyhow::Result<()> {
    for crd in [RhpamDev::crd(), RhpamUser::crd()] {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
