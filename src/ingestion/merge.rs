//! Filename-similarity grouping and row-wise merging of input shards.
//!
//! Files whose names are near-identical (`patients_a.csv`, `patients_a_v2.csv`) are treated as
//! fragments of one logical dataset and concatenated before cleaning.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::PrepResult;

use super::csv::RawTable;

/// Default similarity score a filename must exceed to join a group.
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 85;

/// Prefix of the intermediate merged artifact written for each group.
pub const MERGED_PREFIX: &str = "merged_";

/// Similarity of two strings in `0..=100`.
///
/// This is the indel ratio: `2 * LCS / (len(a) + len(b))`, scaled and rounded, computed
/// over chars.
pub fn similarity_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    let lcs = longest_common_subsequence(&a, &b);
    (200.0 * lcs as f64 / total as f64).round() as u8
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev_row = vec![0usize; b.len() + 1];
    let mut curr_row = vec![0usize; b.len() + 1];

    for a_char in a {
        for (j, b_char) in b.iter().enumerate() {
            curr_row[j + 1] = if a_char == b_char {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Group names whose similarity to a group's first member is strictly above `threshold`.
///
/// Names are visited in sorted order so the grouping does not depend on directory listing
/// order. Each group's first element is its representative.
pub fn group_similar_files(names: &[String], threshold: u8) -> Vec<Vec<String>> {
    let mut remaining: Vec<String> = names.to_vec();
    remaining.sort();

    let mut groups = Vec::new();
    while !remaining.is_empty() {
        let base = remaining.remove(0);
        let (similar, rest): (Vec<String>, Vec<String>) = remaining
            .into_iter()
            .partition(|other| similarity_ratio(&base, other) > threshold);
        remaining = rest;

        let mut group = Vec::with_capacity(similar.len() + 1);
        group.push(base);
        group.extend(similar);
        groups.push(group);
    }
    groups
}

/// One group of similar input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    /// Filename the group (and its outputs) are named after.
    pub representative: String,
    /// Every input filename in the group, representative first.
    pub members: Vec<String>,
}

/// A group whose shards have been concatenated and written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedGroup {
    pub group: FileGroup,
    /// Location of the `merged_<representative>` artifact.
    pub path: PathBuf,
}

/// List the CSV files directly inside `dir`, by filename.
pub fn list_csv_files(dir: impl AsRef<Path>) -> PrepResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping non-utf8 filename");
            continue;
        };
        let is_csv = entry
            .path()
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            names.push(name.to_owned());
        } else {
            warn!(file = name, "skipping non-csv input");
        }
    }
    names.sort();
    Ok(names)
}

/// Scan `input_dir` and group its CSV files by filename similarity.
pub fn plan_groups(input_dir: impl AsRef<Path>, threshold: u8) -> PrepResult<Vec<FileGroup>> {
    let names = list_csv_files(input_dir)?;
    let groups = group_similar_files(&names, threshold)
        .into_iter()
        .map(|members| FileGroup {
            representative: members[0].clone(),
            members,
        })
        .collect::<Vec<_>>();
    debug!(files = names.len(), groups = groups.len(), "grouped input files");
    Ok(groups)
}

/// Concatenate a group's shards and write `merged_<representative>` into `save_dir`.
pub fn merge_group(
    input_dir: impl AsRef<Path>,
    save_dir: impl AsRef<Path>,
    group: &FileGroup,
) -> PrepResult<MergedGroup> {
    let mut merged = RawTable::default();
    for name in &group.members {
        let table = RawTable::from_path(input_dir.as_ref().join(name))?;
        merged.concat(table);
    }

    let path = save_dir
        .as_ref()
        .join(format!("{MERGED_PREFIX}{}", group.representative));
    merged.write_path(&path)?;
    info!(
        representative = %group.representative,
        shards = group.members.len(),
        rows = merged.records.len(),
        "merged group"
    );

    Ok(MergedGroup {
        group: group.clone(),
        path,
    })
}

/// Group and merge every CSV in `input_dir`, writing the merged artifacts to `save_dir`.
///
/// A group whose shards cannot be read is returned as an `Err` entry; other groups are
/// unaffected.
pub fn merge_directory(
    input_dir: impl AsRef<Path>,
    save_dir: impl AsRef<Path>,
    threshold: u8,
) -> PrepResult<Vec<(FileGroup, PrepResult<MergedGroup>)>> {
    let input_dir = input_dir.as_ref();
    let save_dir = save_dir.as_ref();
    std::fs::create_dir_all(save_dir)?;

    let groups = plan_groups(input_dir, threshold)?;
    Ok(groups
        .into_iter()
        .map(|g| {
            let merged = merge_group(input_dir, save_dir, &g);
            (g, merged)
        })
        .collect())
}
