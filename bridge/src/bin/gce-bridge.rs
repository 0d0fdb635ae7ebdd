// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Executable that runs the GCE bridge

use anyhow::anyhow;
use anyhow::Context;
use clap::Parser;
use gce_bridge::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "gce-bridge", about = "GCE-compatible API bridge for OpenStack")]
struct Args {
    #[clap(long)]
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = Config::from_file(&args.config_file)
        .with_context(|| format!("loading {:?}", args.config_file))?;
    gce_bridge::run_server(&config)
        .await
        .map_err(|message| anyhow!("server exiting: {}", message))
}
