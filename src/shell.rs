//! the interactive command loop over a mounted image
use std::{
    io::{self, BufRead, Write},
    path::Path,
};

use log::warn;

use crate::fs::{FsError, InodeKind, Sfs, MAX_FILE_SIZE};

/// byte that ends content capture for `creat`
pub const CONTENT_ESCAPE: u8 = 0x1b;
/// most content bytes one `creat` will capture
pub const CONTENT_CAPTURE_LIMIT: usize = MAX_FILE_SIZE - 1;

/// mount the image and drive the command loop from stdin until `exit`
/// or end of input
pub fn run<P>(image_path: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let mut fs = Sfs::mount(image_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    repl(&mut fs, &mut stdin.lock(), &mut stdout.lock())
}

/// the command loop proper, reader and writer injected so tests can
/// script whole sessions
pub fn repl<R, W>(fs: &mut Sfs, reader: &mut R, out: &mut W) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(out, "SFS::{}# ", fs.cwd_name())?;
        out.flush()?;
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break; // end of input
        }
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            continue;
        };
        let arg = tokens.next().unwrap_or("");
        match command {
            "ls" => {
                let listing = fs.list()?;
                print_listing(out, &listing)?;
            }
            "cd" => match fs.change_dir(arg) {
                Err(FsError::NotFound(name)) => writeln!(out, "{name}: No such directory.")?,
                other => report(out, other)?,
            },
            "md" => match fs.make_dir(arg) {
                Err(FsError::InvalidName) => writeln!(out, "Usage: md <directory name>")?,
                other => report(out, other)?,
            },
            "rd" => fs.reset_to_root(),
            "creat" => {
                writeln!(out, "give input")?;
                let content =
                    read_content_until_escape(reader, CONTENT_ESCAPE, CONTENT_CAPTURE_LIMIT)?;
                match fs.create_file(arg, &content) {
                    Err(FsError::InvalidName) => writeln!(out, "Usage: creat <file name>")?,
                    other => report(out, other)?,
                }
            }
            "display" => match fs.read_file(arg) {
                Ok(content) => writeln!(out, "{}", String::from_utf8_lossy(&content))?,
                // the original stayed silent on a miss
                Err(FsError::NotFound(_)) => {}
                Err(error) => report(out, Err(error))?,
            },
            "rm" => match fs.remove_entry(arg) {
                Err(FsError::NotFound(_)) => writeln!(out, "ERROR: file or dir not found.")?,
                other => report(out, other)?,
            },
            "stat" => {
                let (free_blocks, free_inodes) = fs.stat();
                writeln!(
                    out,
                    "{free_blocks} block{} free.",
                    if free_blocks <= 1 { "" } else { "s" }
                )?;
                writeln!(
                    out,
                    "{free_inodes} inode entr{} free.",
                    if free_inodes <= 1 { "y" } else { "ies" }
                )?;
            }
            "exit" => break,
            unknown => {
                warn!("unrecognized command {unknown}");
                writeln!(out, "No command found")?;
            }
        }
    }
    Ok(())
}

/// print a recoverable error and carry on; fatal errors abort the loop
fn report<W>(out: &mut W, result: Result<(), FsError>) -> anyhow::Result<()>
where
    W: Write,
{
    match result {
        Ok(()) => Ok(()),
        Err(error) if error.is_fatal() => Err(error.into()),
        Err(error) => {
            writeln!(out, "{error}")?;
            Ok(())
        }
    }
}

fn print_listing<W>(out: &mut W, listing: &[(String, InodeKind)]) -> anyhow::Result<()>
where
    W: Write,
{
    let mut total_files = 0;
    let mut total_dirs = 0;
    for (name, kind) in listing {
        match kind {
            InodeKind::File => {
                write!(out, "{name}\t")?;
                total_files += 1;
            }
            InodeKind::Directory => {
                // directories render in red
                write!(out, "\x1B[31m{name}\x1B[0m\t")?;
                total_dirs += 1;
            }
        }
    }
    writeln!(
        out,
        "\n{total_files} file{} and {total_dirs} director{}.",
        if total_files <= 1 { "" } else { "s" },
        if total_dirs <= 1 { "y" } else { "ies" }
    )?;
    Ok(())
}

/// capture file content from the reader until the sentinel byte, end of
/// input, or the byte limit; the sentinel itself is consumed but never
/// stored
pub fn read_content_until_escape<R>(
    reader: &mut R,
    sentinel: u8,
    limit: usize,
) -> io::Result<Vec<u8>>
where
    R: BufRead,
{
    let mut content = Vec::new();
    loop {
        let (used, done) = {
            let buffer = reader.fill_buf()?;
            if buffer.is_empty() {
                break;
            }
            let mut used = 0;
            let mut done = false;
            for &byte in buffer {
                used += 1;
                if byte == sentinel {
                    done = true;
                    break;
                }
                content.push(byte);
                if content.len() == limit {
                    done = true;
                    break;
                }
            }
            (used, done)
        };
        reader.consume(used);
        if done {
            break;
        }
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Cursor, path::PathBuf};

    #[test]
    fn test_content_capture_stops_at_sentinel() {
        let mut reader = Cursor::new(b"hello\x1bworld".to_vec());
        let content =
            read_content_until_escape(&mut reader, CONTENT_ESCAPE, CONTENT_CAPTURE_LIMIT).unwrap();
        assert_eq!(content, b"hello");
        // the sentinel was consumed, the rest is still there
        let mut rest = String::new();
        reader.read_line(&mut rest).unwrap();
        assert_eq!(rest, "world");
    }

    #[test]
    fn test_content_capture_respects_limit() {
        let mut reader = Cursor::new(vec![b'a'; CONTENT_CAPTURE_LIMIT + 500]);
        let content =
            read_content_until_escape(&mut reader, CONTENT_ESCAPE, CONTENT_CAPTURE_LIMIT).unwrap();
        assert_eq!(content.len(), CONTENT_CAPTURE_LIMIT);
    }

    #[test]
    fn test_content_capture_handles_end_of_input() {
        let mut reader = Cursor::new(b"unterminated".to_vec());
        let content =
            read_content_until_escape(&mut reader, CONTENT_ESCAPE, CONTENT_CAPTURE_LIMIT).unwrap();
        assert_eq!(content, b"unterminated");
    }

    fn scripted_session(name: &str, script: &str) -> String {
        let path = PathBuf::from(format!("/tmp/sfs_shell_{name}.img"));
        if path.exists() {
            std::fs::remove_file(&path).unwrap();
        }
        crate::mkfs::mkfs(&path).unwrap();
        let mut fs = Sfs::mount(&path).unwrap();
        let mut reader = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        repl(&mut fs, &mut reader, &mut out).unwrap();
        std::fs::remove_file(&path).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_session_make_list_and_navigate() {
        let output = scripted_session("navigate", "md docs\nls\ncd docs\nls\nrd\nexit\n");
        // the new directory renders red in the listing
        assert!(output.contains("\x1B[31mdocs\x1B[0m\t"));
        assert!(output.contains("0 file and 1 directory."));
        // prompt tracks the bare directory name, then root again
        assert!(output.contains("SFS::docs# "));
        assert!(output.ends_with("SFS::/# "));
    }

    #[test]
    fn test_session_create_and_display_file() {
        let output = scripted_session(
            "creat",
            "creat note.txt\nhello disk\x1b\ndisplay note.txt\nls\nexit\n",
        );
        assert!(output.contains("give input"));
        assert!(output.contains("hello disk"));
        assert!(output.contains("1 file and 0 directory."));
    }

    #[test]
    fn test_session_error_reporting() {
        let output = scripted_session(
            "errors",
            "cd nowhere\nmd\nrm ghost\nmd twice\nmd twice\nbogus\nexit\n",
        );
        assert!(output.contains("nowhere: No such directory."));
        assert!(output.contains("Usage: md <directory name>"));
        assert!(output.contains("ERROR: file or dir not found."));
        assert!(output.contains("twice: Already exists."));
        assert!(output.contains("No command found"));
    }

    #[test]
    fn test_session_stat_counts() {
        let output = scripted_session("stat", "stat\nmd d\nstat\nexit\n");
        assert!(output.contains("96 blocks free.\n126 inode entries free."));
        assert!(output.contains("95 blocks free.\n125 inode entries free."));
    }

    #[test]
    fn test_session_display_miss_is_silent() {
        let output = scripted_session("display_miss", "display ghost\nexit\n");
        assert_eq!(output, "SFS::/# SFS::/# ");
    }
}
