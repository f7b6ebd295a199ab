#![deny(clippy::all, clippy::pedantic)]

use crate::args::AssetsCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_blob;

pub async fn handle(ctx: &Ctx, cmd: AssetsCmd) -> Result<(), CliError> {
    match cmd {
        AssetsCmd::Upload { file } => {
            let blob = read_blob(&file).await?;
            let url = ctx.uploader.upload(blob).await?;
            println!("{url}");
            Ok(())
        }
    }
}
