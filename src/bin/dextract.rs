use clap::{App, AppSettings, Arg, SubCommand};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use decfs::util::hexdump;
use decfs::volume::{self, image::Image};

// Possible exit codes
static _EXIT_SUCCESS: i32 = 0;
static EXIT_FAILURE: i32 = 1;

/// If a dash is specified for a filename, this indicates that the user wants
/// to write to standard output.
static STDOUT_PSEUDOFILENAME: &str = "-";

fn main() {
    env_logger::init();

    // Parse command-line arguments
    let app = App::new("DEC Disk Image Extractor")
        .version("0.1.0")
        .about("List and extract files from RT-11 and Files-11 ODS-1 disk images.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("diskimage").required(true))
        .subcommand(
            SubCommand::with_name("dir")
                .about("Show a directory listing")
                .arg(
                    Arg::with_name("verbose")
                        .short("v")
                        .long("verbose")
                        .multiple(true)
                        .help("Show more detail"),
                )
                .arg(
                    Arg::with_name("machine")
                        .long("machine")
                        .help("Emit machine-readable FILE_INFO records"),
                ),
        )
        .subcommand(
            SubCommand::with_name("read")
                .about("Read one file from a disk image.")
                .arg(Arg::with_name("source_filename").required(true))
                .arg(Arg::with_name("destination_filename").required(false)),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract every file from a disk image.")
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .default_value(".")
                        .help("Output directory"),
                ),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Provide a hex dump of a disk image or file.")
                .arg(Arg::with_name("filename").required(false)),
        );

    let mut app_clone = app.clone();
    let matches = app.get_matches();

    let diskimage = matches.value_of("diskimage").unwrap();
    let result = match matches.subcommand() {
        ("dir", Some(m)) => cmd_dir(
            diskimage,
            m.occurrences_of("verbose"),
            m.is_present("machine"),
        ),
        ("read", Some(m)) => cmd_read(
            diskimage,
            m.value_of("source_filename").unwrap(),
            m.value_of("destination_filename"),
        ),
        ("extract", Some(m)) => cmd_extract(diskimage, m.value_of("output").unwrap()),
        ("dump", Some(m)) => cmd_dump(diskimage, m.value_of("filename")),
        _ => {
            app_clone.print_help().unwrap();
            println!();
            process::exit(EXIT_FAILURE);
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_FAILURE);
    }
}

fn cmd_dir(diskimage: &str, verbosity: u64, machine: bool) -> io::Result<()> {
    let volume = volume::open(diskimage)?;
    if !machine {
        println!("{}", volume.describe());
    }
    let files = volume.list_files()?;
    for file in files.iter() {
        if machine {
            println!("{}", file.info_line(&file.name));
        } else if verbosity > 0 {
            println!(
                "{:<16} {:>6} blocks {:>9} bytes  {:<10} {}",
                file.name,
                file.size_blocks,
                file.size_bytes,
                file.kind,
                file.date.as_deref().unwrap_or("")
            );
        } else {
            println!("{}", file.name);
        }
    }
    if !machine {
        println!("{} file(s).", files.len());
    }
    Ok(())
}

fn cmd_read(
    diskimage: &str,
    source_filename: &str,
    destination_filename: Option<&str>,
) -> io::Result<()> {
    let destination_filename = destination_filename.unwrap_or(source_filename);
    let volume = volume::open(diskimage)?;
    let file = volume.extract_file(source_filename)?;
    if destination_filename == STDOUT_PSEUDOFILENAME {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        out.write_all(&file.data)?;
        out.flush()?;
    } else {
        fs::write(destination_filename, &file.data)?;
    }
    Ok(())
}

fn cmd_extract(diskimage: &str, output: &str) -> io::Result<()> {
    let volume = volume::open(diskimage)?;
    let tally = volume::extract_all(&*volume, Path::new(output))?;
    println!(
        "{} file(s) extracted, {} failed.",
        tally.extracted, tally.failed
    );
    if tally.failed > 0 {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} file(s) could not be extracted.", tally.failed),
        ))
    } else {
        Ok(())
    }
}

fn cmd_dump(diskimage: &str, filename: Option<&str>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match filename {
        Some(filename) => {
            let volume = volume::open(diskimage)?;
            let file = volume.extract_file(filename)?;
            out.write_all(hexdump(&file.data).as_bytes())?;
        }
        None => {
            let image = Image::open(diskimage)?;
            let bytes = image.slice(0, image.len())?;
            out.write_all(hexdump(bytes).as_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}
