use std::io::{self, Write};

use serde::Serialize;

use crate::app::RunView;
use crate::drawer::DrawerRecord;
use crate::projector::AnnotationRow;
use crate::resolver::DownloadDescriptor;
use crate::selection::Selection;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Json,
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub address: String,
    pub selection: Selection,
    pub descriptor: DownloadDescriptor,
    pub file_size: Option<u64>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_view(view: &RunView) -> io::Result<()> {
        Self::print_json(view)
    }

    pub fn print_resolve(result: &ResolveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_rows(rows: &[AnnotationRow]) -> io::Result<()> {
        Self::print_json(&rows)
    }

    pub fn print_drawers(records: &[DrawerRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_resolve(result: &ResolveResult) {
        println!("address:  ?{}", result.address);
        println!("selection: {}", describe_selection(&result.selection));
        match (&result.descriptor.storage_path, &result.descriptor.transfer_path) {
            (None, None) => println!("download: unresolved"),
            (storage, transfer) => {
                println!("s3:       {}", storage.as_deref().unwrap_or("-"));
                println!("https:    {}", transfer.as_deref().unwrap_or("-"));
            }
        }
        if let Some(size) = result.file_size {
            println!("size:     {size} bytes");
        }
    }

    pub fn print_rows(rows: &[AnnotationRow]) {
        for row in rows {
            let gt = if row.ground_truth_status { " [ground truth]" } else { "" };
            println!(
                "{:>8}  {:<30} {:<16} {:<8}{gt}",
                row.id, row.object_name, row.shape_type, row.format
            );
        }
    }

    pub fn print_drawers(records: &[DrawerRecord]) {
        for record in records {
            match &record.tab {
                Some(tab) => println!("{:<11} open ({tab})", record.kind),
                None => println!("{:<11} closed", record.kind),
            }
        }
    }
}

fn describe_selection(selection: &Selection) -> String {
    match selection {
        Selection::Annotation(selection) => format!(
            "annotation {} ({} / {})",
            selection.annotation_id,
            selection.shape_type.as_deref().unwrap_or("?"),
            selection.file_format.as_deref().unwrap_or("?"),
        ),
        Selection::Tomogram(selection) => format!(
            "tomogram {:?} ({})",
            selection.target,
            selection.file_format.as_deref().unwrap_or("?"),
        ),
        Selection::AllAnnotations => "all annotations".to_string(),
        Selection::Unresolved => "unresolved".to_string(),
    }
}
