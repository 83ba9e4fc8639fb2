use crate::{DocId, IdfTable, InvertedIndex, PostingList, Snapshot, WeightMatrix};
use anyhow::{bail, Context, Result};
use bincode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub vocabulary: usize,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn for_snapshot(snapshot: &Snapshot, created_at: String) -> Self {
        Self {
            num_docs: snapshot.index.num_docs(),
            num_terms: snapshot.index.num_terms(),
            vocabulary: snapshot.tfidf.num_terms(),
            created_at,
            version: 1,
        }
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn inverted_list(&self) -> PathBuf { self.root.join("inverted_list.txt") }
    pub fn tf(&self) -> PathBuf { self.root.join("tf.csv") }
    pub fn idf(&self) -> PathBuf { self.root.join("idf.csv") }
    pub fn tfidf(&self) -> PathBuf { self.root.join("tfidf.csv") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
}

/// `term: id1, id2, ...` per line, terms and IDs ascending.
pub fn format_inverted_list(index: &InvertedIndex) -> String {
    let mut out = String::new();
    for (term, postings) in index.iter() {
        let ids: Vec<String> = postings.iter().map(|id| id.to_string()).collect();
        let _ = writeln!(out, "{}: {}", term, ids.join(", "));
    }
    out
}

/// Inverse of [`format_inverted_list`]. Lines without `:` are ignored and
/// unparseable IDs are skipped with a warning. The universe of the result is
/// the union of its postings. Terms may themselves contain `:`; the last one
/// on the line is the separator.
pub fn parse_inverted_list(text: &str) -> InvertedIndex {
    let mut postings: BTreeMap<String, PostingList> = BTreeMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let Some((term, ids)) = line.rsplit_once(':') else { continue };
        let mut parsed = Vec::new();
        for raw in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match raw.parse::<DocId>() {
                Ok(id) => parsed.push(id),
                Err(_) => tracing::warn!(line = lineno + 1, id = raw, "skipping malformed document id"),
            }
        }
        postings.insert(term.trim().to_string(), PostingList::from_unsorted(parsed));
    }
    InvertedIndex::from_parts(postings, PostingList::new())
}

/// Header `,doc_<id>,...`; one row per term; `%.6f` cells, empty when undefined.
pub fn format_weight_csv(matrix: &WeightMatrix) -> String {
    let mut out = String::new();
    for doc in matrix.docs() {
        let _ = write!(out, ",doc_{doc}");
    }
    out.push('\n');
    for (row, term) in matrix.terms().iter().enumerate() {
        push_term_cell(&mut out, term);
        for col in 0..matrix.num_docs() {
            out.push(',');
            if let Some(v) = matrix.cell(row, col) {
                let _ = write!(out, "{v:.6}");
            }
        }
        out.push('\n');
    }
    out
}

pub fn parse_weight_csv(text: &str) -> Result<WeightMatrix> {
    let mut lines = text.lines();
    let header = lines.next().context("weight table is empty")?;
    let mut docs = Vec::new();
    for col in header.split(',').skip(1) {
        let id = col
            .strip_prefix("doc_")
            .and_then(|s| s.parse::<DocId>().ok())
            .with_context(|| format!("bad column header: {col:?}"))?;
        docs.push(id);
    }

    let mut entries = Vec::new();
    for (lineno, line) in lines.enumerate() {
        if line.trim().is_empty() { continue; }
        let (term, rest) = split_term_cell(line).with_context(|| format!("bad term cell on row {}", lineno + 2))?;
        let values: Vec<&str> = rest.map(|r| r.split(',').collect()).unwrap_or_default();
        if values.len() != docs.len() {
            bail!("row {} has {} cells, expected {}", lineno + 2, values.len(), docs.len());
        }
        for (doc, raw) in docs.iter().zip(values) {
            if raw.is_empty() { continue; }
            let v: f64 = raw.parse().with_context(|| format!("bad cell {raw:?} on row {}", lineno + 2))?;
            entries.push((term.clone(), *doc, v));
        }
    }
    Ok(WeightMatrix::with_columns(docs, entries))
}

pub fn format_idf_csv(idf: &IdfTable) -> String {
    let mut out = String::from(",IDF\n");
    for (term, v) in idf.iter() {
        push_term_cell(&mut out, term);
        let _ = writeln!(out, ",{v:.6}");
    }
    out
}

pub fn parse_idf_csv(text: &str) -> Result<IdfTable> {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> Result<(String, f64)> {
            let (term, raw) = split_term_cell(line).with_context(|| format!("bad idf row: {line:?}"))?;
            let raw = raw.with_context(|| format!("idf row has no value: {line:?}"))?;
            let v: f64 = raw.parse().with_context(|| format!("bad idf value: {raw:?}"))?;
            Ok((term, v))
        })
        .collect()
}

/// First CSV cell of a row. Terms holding `,` or `"` are quoted with `""`
/// escapes; corpus terms never contain line breaks.
fn push_term_cell(out: &mut String, term: &str) {
    if term.contains([',', '"']) {
        out.push('"');
        out.push_str(&term.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(term);
    }
}

/// Inverse of [`push_term_cell`]: the unquoted term and the text after the
/// separating comma, if any.
fn split_term_cell(line: &str) -> Result<(String, Option<&str>)> {
    let Some(quoted) = line.strip_prefix('"') else {
        return Ok(match line.split_once(',') {
            Some((term, rest)) => (term.to_string(), Some(rest)),
            None => (line.to_string(), None),
        });
    };
    let mut term = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            term.push(c);
            continue;
        }
        if chars.next_if(|&(_, next)| next == '"').is_some() {
            term.push('"');
            continue;
        }
        let rest = &quoted[i + 1..];
        return match rest.strip_prefix(',') {
            Some(rest) => Ok((term, Some(rest))),
            None if rest.is_empty() => Ok((term, None)),
            None => bail!("text after closing quote: {rest:?}"),
        };
    }
    bail!("unterminated quoted cell")
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    f.write_all(bytes)?;
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(snapshot)?;
    write_file(&paths.snapshot(), &bytes)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let mut f = File::open(paths.snapshot())
        .with_context(|| format!("opening {}", paths.snapshot().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let snapshot = bincode::deserialize(&buf)?;
    Ok(snapshot)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_file(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let meta: MetaFile = serde_json::from_str(&read_text(&paths.meta())?)?;
    Ok(meta)
}

/// Write the inverted list, the three weight tables and the binary snapshot.
pub fn save_artifacts(paths: &IndexPaths, snapshot: &Snapshot) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_file(&paths.inverted_list(), format_inverted_list(&snapshot.index).as_bytes())?;
    write_file(&paths.tf(), format_weight_csv(&snapshot.tf).as_bytes())?;
    write_file(&paths.idf(), format_idf_csv(&snapshot.idf).as_bytes())?;
    write_file(&paths.tfidf(), format_weight_csv(&snapshot.tfidf).as_bytes())?;
    save_snapshot(paths, snapshot)
}

/// Load `snapshot.bin`, falling back to the text tables when it is absent.
pub fn load_index(paths: &IndexPaths) -> Result<Snapshot> {
    if paths.snapshot().is_file() {
        return load_snapshot(paths);
    }
    tracing::info!(root = %paths.root.display(), "no binary snapshot, reading text tables");
    let index = parse_inverted_list(&read_text(&paths.inverted_list())?);
    let tf = parse_weight_csv(&read_text(&paths.tf())?)?;
    let idf = parse_idf_csv(&read_text(&paths.idf())?)?;
    let tfidf = parse_weight_csv(&read_text(&paths.tfidf())?)?;
    Ok(Snapshot::from_parts(index, tf, idf, tfidf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_list_format() {
        let index = parse_inverted_list("кот: 3, 1\nмышь: 2\nno separator\n");
        assert_eq!(format_inverted_list(&index), "кот: 1, 3\nмышь: 2\n");
        assert_eq!(index.universe().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn weight_csv_keeps_empty_cells() {
        let m = WeightMatrix::from_entries(vec![
            ("b".to_string(), 10, 0.25),
            ("a".to_string(), 2, 1.0 / 3.0),
        ]);
        let text = format_weight_csv(&m);
        assert_eq!(text, ",doc_2,doc_10\na,0.333333,\nb,,0.250000\n");
        let back = parse_weight_csv(&text).unwrap();
        assert_eq!(back.docs(), &[2, 10]);
        assert_eq!(back.get("a", 10), None);
        assert_eq!(back.get("b", 10), Some(0.25));
    }

    #[test]
    fn inverted_list_keeps_colons_in_terms() {
        let index = parse_inverted_list("c++:std: 1\nкот: 1, 2\n");
        assert_eq!(index.get("c++:std"), &[1]);
        assert_eq!(format_inverted_list(&index), "c++:std: 1\nкот: 1, 2\n");
    }

    #[test]
    fn weight_csv_quotes_terms_with_commas() {
        let m = WeightMatrix::from_entries(vec![
            ("a,b".to_string(), 1, 0.5),
            ("say\"hi\"".to_string(), 2, 0.25),
            ("plain".to_string(), 1, 1.0),
        ]);
        let text = format_weight_csv(&m);
        assert!(text.contains("\n\"a,b\",0.500000,\n"));
        assert!(text.contains("\n\"say\"\"hi\"\"\",,0.250000\n"));
        let back = parse_weight_csv(&text).unwrap();
        assert_eq!(back.terms(), m.terms());
        assert_eq!(back.get("a,b", 1), Some(0.5));
        assert_eq!(back.get("say\"hi\"", 2), Some(0.25));
    }

    #[test]
    fn malformed_quoted_cells_are_errors() {
        assert!(parse_weight_csv(",doc_1\n\"a,b,0.5\n").is_err());
        assert!(parse_weight_csv(",doc_1\n\"a\"x,0.5\n").is_err());
        assert!(parse_idf_csv(",IDF\n\"a,b\"\n").is_err());
    }

    #[test]
    fn weight_csv_rejects_bad_header() {
        assert!(parse_weight_csv(",document1\n").is_err());
    }

    #[test]
    fn idf_csv_round_trip() {
        let idf: IdfTable = vec![("x".to_string(), 0.5), ("y".to_string(), 0.0)].into_iter().collect();
        let text = format_idf_csv(&idf);
        assert_eq!(text, ",IDF\nx,0.500000\ny,0.000000\n");
        assert_eq!(parse_idf_csv(&text).unwrap(), idf);

        let odd: IdfTable = vec![("a,b".to_string(), 1.5)].into_iter().collect();
        let text = format_idf_csv(&odd);
        assert_eq!(text, ",IDF\n\"a,b\",1.500000\n");
        assert_eq!(parse_idf_csv(&text).unwrap(), odd);
    }
}
