use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum SfsCli {
    /// create and format a new disk image
    Mkfs(MkfsArgs),
    /// mount a disk image and run the interactive shell
    Shell(ShellArgs),
}
///make a new disk image subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new disk image")]
pub struct MkfsArgs {
    /// the path of the disk image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

/// run the interactive shell subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "mount a disk image and run the shell")]
pub struct ShellArgs {
    /// the path of the disk image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}


/// test the `SfsCli` struct
/// test `shell` subcommand
#[cfg(test)]
mod shell_parse_args_tests {
    use super::*;
    /// test short parameter form
    #[test]
    fn test_short_parameter_form() {
        let args = SfsCli::parse_from(["sfs", "shell", "-p", "test.img"]);
        assert_eq!(
            args,
            SfsCli::Shell(ShellArgs {
                image_file_path: "test.img".to_string(),
            })
        );
    }
    /// test long parameter form
    #[test]
    fn test_long_parameter_form() {
        let image_file_path_name = concat!("--", "image-file-path");
        let args = SfsCli::parse_from(["sfs", "shell", image_file_path_name, "test.img"]);
        assert_eq!(
            args,
            SfsCli::Shell(ShellArgs {
                image_file_path: "test.img".to_string(),
            })
        );
    }
}
