use super::super::args::*;
use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => super::run::run(args).await,
        Command::Archive(args) => super::archive::run(args),
        Command::Upload(args) => super::upload::run(args).await,
        Command::Unit(args) => super::unit::run(args).await,
        Command::Verdict(args) => super::verdict::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
