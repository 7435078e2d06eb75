use std::path::PathBuf;

use anyhow::Context as _;
use engine::{CellMetrics, MonospaceMetrics};
use txtreader_core::{GlyphMetrics, Viewport};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut file: Option<PathBuf> = None;
    let mut width: u32 = 80;
    let mut height: u32 = 24;
    let mut glyph_width: Option<u32> = None;
    let mut line_height: u32 = 1;
    let mut page_number: u32 = 1;
    let mut markup = false;

    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "--file" => {
                let value = args.next().context("missing value for --file")?;
                file = Some(PathBuf::from(value));
            }
            "--width" => width = parse_u32(args.next(), "--width")?,
            "--height" => height = parse_u32(args.next(), "--height")?,
            "--glyph-width" => glyph_width = Some(parse_u32(args.next(), "--glyph-width")?),
            "--line-height" => line_height = parse_u32(args.next(), "--line-height")?,
            "--page" => {
                page_number = parse_u32(args.next(), "--page")?;
                if page_number == 0 {
                    anyhow::bail!("--page must be >= 1");
                }
            }
            "--markup" => markup = true,
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => anyhow::bail!("unknown arg: {other} (try --help)"),
        }
    }

    let file = file.context("must pass --file <path> (try --help)")?;
    let boxed: Box<dyn GlyphMetrics> = match glyph_width {
        Some(w) => Box::new(MonospaceMetrics::new(w, line_height)),
        None => Box::new(CellMetrics::new(1, line_height)),
    };
    let metrics: &dyn GlyphMetrics = boxed.as_ref();
    let viewport = Viewport::for_metrics(width, height, &metrics);

    let pages = engine::paginate_file(&file, &viewport, metrics)
        .with_context(|| format!("paginate {}", file.display()))?;
    println!(
        "pages: {} (viewport {}x{}, {} lines/page)",
        pages.len(),
        viewport.available_width_px,
        viewport.available_height_px,
        viewport.max_lines()
    );

    let Some(page) = pages.get(page_number.saturating_sub(1) as usize) else {
        if !pages.is_empty() {
            anyhow::bail!("page {page_number} out of range (1..={})", pages.len());
        }
        return Ok(());
    };

    if markup {
        println!("{page}");
    } else {
        println!("=== page {page_number} ===");
        for line in page.lines() {
            println!("{}", line.as_str());
        }
    }

    Ok(())
}

fn parse_u32(value: Option<std::ffi::OsString>, flag: &str) -> anyhow::Result<u32> {
    let value = value.with_context(|| format!("missing value for {flag}"))?;
    let value_str = value.to_string_lossy();
    value_str
        .parse::<u32>()
        .with_context(|| format!("invalid {flag} value: {value_str}"))
}

fn print_help() {
    println!(
        "\
paginate_probe

Usage:
  cargo run -p engine --bin paginate_probe -- --file <path> [options]

Options:
  --file <path>          Text file to paginate
  --width <px>           Available width (default: 80)
  --height <px>          Available height (default: 24)
  --glyph-width <px>     Measure every glyph at this width (default: terminal cells)
  --line-height <px>     Line height (default: 1)
  --page <n>             Page to print (1-based, default: 1)
  --markup               Print the page as a delimited fragment
  --help                 Show this help
"
    );
}
