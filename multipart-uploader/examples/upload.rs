/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use multipart_uploader::error::DisplayErrorContext;
use multipart_uploader::io::InputStream;
use multipart_uploader::metrics::ByteSize;
use tracing::{debug_span, Instrument};

type BoxError = Box<dyn Error + Send + Sync>;

const ONE_MEBIBYTE: u64 = 1024 * 1024;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "upload")]
#[command(about = "Uploads a local file through an upload backend in parallel parts.")]
pub struct Args {
    /// Local file to upload
    #[arg(required = true)]
    source: PathBuf,

    /// Base URL of the upload backend (defaults to UPLOADER_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Number of concurrent part uploads to perform.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Part size to use, in MiB
    #[arg(long)]
    part_size_mb: Option<u64>,

    /// Gzip the file while uploading
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    compress: bool,
}

async fn do_upload(args: Args) -> Result<(), BoxError> {
    let mut loader = multipart_uploader::from_env();
    if let Some(base_url) = args.base_url {
        loader = loader.base_url(base_url);
    }
    if let Some(concurrency) = args.concurrency {
        loader = loader.max_threads(concurrency);
    }
    if let Some(part_size) = args.part_size_mb {
        loader = loader.chunk_size(part_size * ONE_MEBIBYTE);
    }
    if args.compress {
        loader = loader.compression_enabled(true);
    }
    let client = multipart_uploader::Client::new(loader.load());

    let name = args
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or("source has no file name")?;
    let body = InputStream::from_path(&args.source)?;

    println!("starting upload of {}", ByteSize(body.content_length()));
    let start = std::time::Instant::now();
    let handle = client
        .upload()
        .name(name)
        .body(body)
        .on_progress(move |p| {
            println!(
                "{:>3}% ({}/{} bytes) after {:.1?}",
                p.percentage(),
                p.sent(),
                p.total(),
                start.elapsed()
            );
        })
        .initiate()?;

    let output = handle.join().instrument(debug_span!("upload")).await?;
    println!(
        "uploaded {} as {} in {} parts in {:?}; {}",
        args.source.display(),
        output.storage_key(),
        output.parts().len(),
        output.elapsed(),
        output.throughput()
    );
    println!(
        "Local file is {} bytes, compressed to {} bytes, ratio = {:.2}",
        output.bytes_read(),
        output.bytes_uploaded(),
        output.compression_ratio()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    if let Err(ref err) = do_upload(args).await {
        tracing::error!("upload failed: {}", DisplayErrorContext(err.as_ref()));
    }

    Ok(())
}
