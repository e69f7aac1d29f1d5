mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::ops::ControlFlow;

use clap::Parser;
use cli::Cli;
use flat_fs_fuse::Shell;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut shell = Shell::new();
    let mut startup = Vec::new();
    if let Some(image) = &cli.image {
        let image = image.display();
        if let Some(size) = cli.create {
            startup.push(format!("createFile {image} {size}"));
        }
        startup.push(format!("mount {image}"));
        if cli.format {
            startup.push(String::from("format"));
        }
    }
    for line in &startup {
        if run(&mut shell, line)?.is_break() {
            return Ok(());
        }
    }

    let interactive = cli.script.is_none();
    let input: Box<dyn BufRead> = match &cli.script {
        Some(script) => Box::new(BufReader::new(File::open(script)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut lines = input.lines();
    loop {
        if interactive {
            print!("> ");
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        if run(&mut shell, &line?)?.is_break() {
            break;
        }
    }

    Ok(())
}

fn run(shell: &mut Shell, line: &str) -> io::Result<ControlFlow<()>> {
    let mut out = String::new();
    let flow = shell.execute_line(line, &mut out);
    io::stdout().write_all(out.as_bytes())?;

    Ok(flow)
}
