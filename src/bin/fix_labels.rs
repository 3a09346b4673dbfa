//! Rewrites label files so the class field is an integer, repairing
//! datasets produced by writers that stored it as a float.

use std::path::Path;
use vidlabel::{labels, Error};

const LABEL_PATH: &str = "yolo_labels";

fn main() -> Result<(), Error> {
    env_logger::init();

    let mut args = std::env::args();
    let _ = args.next();
    let dir = args.next().unwrap_or_else(|| LABEL_PATH.to_string());

    let fixed = labels::fix_class_ids(Path::new(&dir))?;
    println!("rewrote {fixed} label files in {dir}");

    Ok(())
}
