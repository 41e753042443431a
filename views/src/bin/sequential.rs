use anyhow::Context;
use atomicwrites::{AllowOverwrite, AtomicFile};
use log::{debug, info, trace};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use election_views::app::election::{IdView, SentimentView};
use election_views::reduce::{self, Reducer};
use election_views::{input, map_all, Error, Keywords, View, ViewResponse, ELECTION_KEYWORDS};

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "sequential", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Files of documents to map
    #[structopt(name = "FILE", parse(from_os_str))]
    files: Vec<PathBuf>,

    /// View to run: sentiment or ids
    #[structopt(long, default_value = "sentiment")]
    view: String,

    /// Keyword to match, may be repeated
    #[structopt(long = "keyword")]
    keywords: Vec<String>,

    /// JavaScript regex literal to match, e.g. /scott ?morrison/i, may be repeated
    #[structopt(long = "pattern")]
    patterns: Vec<String>,

    /// Emit tweets whose compound score is exactly zero
    #[structopt(long)]
    keep_zero_compound: bool,

    /// Built-in reduce function: _count, _sum or _stats
    #[structopt(long)]
    reduce: Option<Reducer>,

    /// Group reduced rows by exact key
    #[structopt(long)]
    group: bool,

    /// Group reduced rows by the first n key elements
    #[structopt(long)]
    group_level: Option<usize>,

    #[structopt(short, long, parse(from_os_str), default_value = "target/view-out.json")]
    output: PathBuf,
}

fn view(opt: &Opt) -> anyhow::Result<Box<dyn View>> {
    if opt.keywords.is_empty() && opt.patterns.is_empty() {
        trace!("using default keywords {:?}", ELECTION_KEYWORDS);
    }
    let keywords = Keywords::from_args(&opt.keywords, &opt.patterns)?;
    match opt.view.as_str() {
        "sentiment" => Ok(Box::new(
            SentimentView::new(keywords).keep_zero_compound(opt.keep_zero_compound),
        )),
        "ids" => Ok(Box::new(IdView::new(keywords))),
        other => Err(Error::UnknownView(other.to_owned()).into()),
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let view = view(&opt)?;
    let grouping = reduce::grouping(opt.reduce, opt.group, opt.group_level)?;

    let mut docs = Vec::new();
    for fname in opt.files.iter() {
        let mut loaded =
            input::load(fname).with_context(|| format!("Error on reading {:?}", fname))?;
        debug!("{:?}: {} documents", fname, loaded.len());
        docs.append(&mut loaded);
    }

    let rows = map_all(&*view, docs.iter());
    info!("{} documents mapped to {} rows", docs.len(), rows.len());

    let response = match grouping {
        Some((reducer, grouping)) => {
            let reduced = reduce::reduce(&rows, reducer, grouping)?;
            info!("{} with {:?}: {} rows", reducer, grouping, reduced.len());
            ViewResponse::reduced(reduced)
        }
        None => ViewResponse::mapped(rows),
    };

    if let Some(dir) = opt.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let body = serde_json::to_string_pretty(&response)?;
    let af = AtomicFile::new(&opt.output, AllowOverwrite);
    af.write(|f| f.write_all(body.as_bytes()))
        .map_err(|e| anyhow::anyhow!("Error on writing {:?}: {}", opt.output, e))?;
    trace!("output {:?}", opt.output);
    Ok(())
}
