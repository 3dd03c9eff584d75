use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bloomblock::reader::BlockDecoder;

#[derive(Parser)]
#[command(
    name = "bloomblock",
    version,
    about = "Inspect bloom-filter index block files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header, footer, and index summary
    Info { input: PathBuf },
    /// List per-page offsets and lengths
    Pages { input: PathBuf },
    /// Validate the index CRC and the outer block checksum
    Verify { input: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let mut dec = BlockDecoder::open(&input)?;
            let header = dec.header()?;
            let footer = dec.footer()?;
            let index = dec.index()?;

            println!("{}", input.display());
            println!("  version        {}", header.version);
            println!("  page encoding  {}", header.encoding.name());
            println!("  fingerprint    {:#018x}", index.fingerprint);
            println!("  pages          {}", index.offsets.len());
            println!("  chunks         {}", index.chunks.len());
            for chunk in &index.chunks {
                println!(
                    "    [{} .. {}] checksum {:#010x}",
                    chunk.from, chunk.through, chunk.checksum
                );
            }
            let fields: Vec<&str> = index.fields.iter().map(String::as_str).collect();
            println!("  fields         {}", fields.join(", "));
            println!("  index offset   {}", footer.index_offset);
            println!("  index length   {} B", footer.index_len);
            println!(
                "  total size     {} B",
                footer.index_offset + footer.index_len + bloomblock::FOOTER_SIZE as u64
            );
        }

        // ── Pages ────────────────────────────────────────────────────────────
        Commands::Pages { input } => {
            let mut dec = BlockDecoder::open(&input)?;
            let index = dec.index()?;
            for (i, locator) in index.offsets.iter().enumerate() {
                println!("page {i:4}  offset {:>10}  length {:>8} B", locator.offset, locator.len);
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let mut dec = BlockDecoder::open(&input)?;
            // index() runs the inner CRC check as a side effect of decoding
            let pages = dec.index()?.offsets.len();
            println!("index checksum   OK ({pages} page(s))");
            dec.verify()?;
            println!("outer checksum   OK");
        }
    }
    Ok(())
}
