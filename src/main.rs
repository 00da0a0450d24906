use clap::Parser;
use sfs::cli_interface::SfsCli;
/// a CLI interface to users to choose create a new SFS disk image,
/// or mount an existing one and drive it from the interactive shell.
///
/// The latter blocks the program until the user types `exit`
/// or closes stdin.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = SfsCli::parse();
    match args {
        SfsCli::Mkfs(args) => {
            // create a new disk image
            sfs::mkfs::mkfs(args.image_file_path)?;
        }
        SfsCli::Shell(args) => {
            // mount an existing image and hand control to the command loop
            sfs::shell::run(args.image_file_path)?;
        }
    }
    Ok(())
}
