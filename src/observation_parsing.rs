
use crate::data_types::observations::{FamilyObservations, PhaseAllele, PhaseObservation};

use flate2::bufread::MultiGzDecoder;
use log::{debug, info};
use rustc_hash::FxHashMap as HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ObservationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected at least 3 fields (family, offspring, calls...), found {found}")]
    TooFewFields { line: u64, found: usize },
    #[error("line {line}: invalid phase call {token:?} at marker {marker}; expected 0, 1, or one of * . -")]
    InvalidCall { line: u64, marker: usize, token: String },
    #[error("line {line}: offspring {offspring_id:?} has {found} markers, but family {family_id:?} has {expected}")]
    MarkerCountMismatch { line: u64, family_id: String, offspring_id: String, expected: usize, found: usize },
    #[error("line {line}: duplicate offspring {offspring_id:?} in family {family_id:?}")]
    DuplicateOffspring { line: u64, family_id: String, offspring_id: String }
}

/// Returns true if the path should be treated as comma-separated, i.e. `.csv` or `.csv.gz`
/// # Arguments
/// * `filename` - the path to check
pub fn is_csv_path(filename: &Path) -> bool {
    let extension = filename.extension().unwrap_or_default();
    if extension == "gz" {
        filename.file_stem()
            .map(|stem| Path::new(stem).extension().unwrap_or_default() == "csv")
            .unwrap_or(false)
    } else {
        extension == "csv"
    }
}

/// Parses half-sib observations from a delimited source.
/// Each row is `family_id, offspring_id, call_0, ..., call_{M-1}` with no header; `#` lines are comments.
/// Families are returned in the order they are first encountered.
/// # Arguments
/// * `reader` - the raw data source
/// * `delimiter` - the field delimiter, usually `\t` or `,`
/// # Errors
/// * if a row has fewer than 3 fields or contains an invalid call
/// * if offspring in the same family have different numbers of markers
/// * if an offspring id is repeated within a family
pub fn parse_observations<R: Read>(reader: R, delimiter: u8) -> Result<Vec<FamilyObservations>, ObservationError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut families: Vec<FamilyObservations> = vec![];
    let mut family_lookup: HashMap<String, usize> = Default::default();
    let mut family_markers: Vec<usize> = vec![];

    for record_result in csv_reader.records() {
        let record = record_result?;
        let line: u64 = record.position().map(|p| p.line()).unwrap_or(0);

        // skip blank lines that made it past the reader
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        // a single trailing delimiter leaves an empty last field, drop it
        let num_fields: usize = match record.get(record.len() - 1) {
            Some("") => record.len() - 1,
            _ => record.len()
        };
        if num_fields < 3 {
            return Err(ObservationError::TooFewFields { line, found: num_fields });
        }

        let family_id: String = record[0].to_string();
        let offspring_id: String = record[1].to_string();
        let mut alleles: Vec<PhaseAllele> = Vec::with_capacity(num_fields - 2);
        for (marker, token) in record.iter().take(num_fields).skip(2).enumerate() {
            match PhaseAllele::from_token(token) {
                Some(allele) => alleles.push(allele),
                None => {
                    return Err(ObservationError::InvalidCall { line, marker, token: token.to_string() });
                }
            };
        }

        let family_index: usize = match family_lookup.get(&family_id) {
            Some(&index) => index,
            None => {
                let index = families.len();
                families.push(FamilyObservations::new(family_id.clone()));
                family_markers.push(alleles.len());
                family_lookup.insert(family_id.clone(), index);
                index
            }
        };

        let expected: usize = family_markers[family_index];
        if alleles.len() != expected {
            return Err(ObservationError::MarkerCountMismatch {
                line, family_id, offspring_id, expected, found: alleles.len()
            });
        }

        if !families[family_index].insert(offspring_id.clone(), PhaseObservation::new(alleles)) {
            return Err(ObservationError::DuplicateOffspring { line, family_id, offspring_id });
        }
    }

    for family in families.iter() {
        debug!("Family {:?}: {} offspring, {} markers", family.family_id(), family.num_offspring(), family.num_markers());
    }
    Ok(families)
}

/// Loads observations from a file, decompressing `.gz` inputs and picking the delimiter from the extension.
/// # Arguments
/// * `filename` - the observation file path
pub fn load_observations(filename: &Path) -> Result<Vec<FamilyObservations>, ObservationError> {
    let file: File = File::open(filename)?;
    let file_reader = BufReader::new(file);
    let reader: Box<dyn Read> = if filename.extension().unwrap_or_default() == "gz" {
        Box::new(MultiGzDecoder::new(file_reader))
    } else {
        Box::new(file_reader)
    };

    let delimiter: u8 = if is_csv_path(filename) { b',' } else { b'\t' };
    let families = parse_observations(reader, delimiter)?;
    let num_offspring: usize = families.iter().map(|f| f.num_offspring()).sum();
    info!("Loaded {} families with {} offspring from {:?}", families.len(), num_offspring, filename);
    Ok(families)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const EXAMPLE_TSV: &str = "\
# family\toffspring\tcalls
sire_1\tT1\t1\t*\t*\t0\t1\t*\t1
sire_1\tT2\t*\t*\t*\t0\t1\t*\t0
sire_2\tA\t0\t1
sire_1\tT3\t0\t*\t*\t*\t0\t*\t0
sire_1\tT4\t*\t*\t*\t*\t*\t*\t*
";

    #[test]
    fn test_parse_observations() {
        let families = parse_observations(EXAMPLE_TSV.as_bytes(), b'\t').unwrap();
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].family_id(), "sire_1");
        assert_eq!(families[0].num_offspring(), 4);
        assert_eq!(families[0].num_markers(), 7);
        assert_eq!(families[0].get("T1").unwrap(), &PhaseObservation::from_values(&[1, 2, 2, 0, 1, 2, 1]));
        assert_eq!(families[0].get("T4").unwrap().known_positions(), Vec::<usize>::new());
        assert_eq!(families[1].family_id(), "sire_2");
        assert_eq!(families[1].num_offspring(), 1);
    }

    #[test]
    fn test_parse_csv() {
        let text = "fam,kid1,0,1,.\nfam,kid2,-,1,1\n";
        let families = parse_observations(text.as_bytes(), b',').unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get("kid2").unwrap(), &PhaseObservation::from_values(&[2, 1, 1]));
    }

    #[test]
    fn test_parse_errors() {
        let too_few = "fam\tkid\n";
        assert!(matches!(parse_observations(too_few.as_bytes(), b'\t'), Err(ObservationError::TooFewFields { found: 2, .. })));

        let bad_call = "fam\tkid\t0\tx\n";
        assert!(matches!(
            parse_observations(bad_call.as_bytes(), b'\t'),
            Err(ObservationError::InvalidCall { marker: 1, .. })
        ));

        let mismatch = "fam\tkid1\t0\t1\nfam\tkid2\t0\t1\t1\n";
        assert!(matches!(
            parse_observations(mismatch.as_bytes(), b'\t'),
            Err(ObservationError::MarkerCountMismatch { line: 2, expected: 2, found: 3, .. })
        ));

        let duplicate = "fam\tkid1\t0\t1\nfam\tkid1\t1\t1\n";
        assert!(matches!(
            parse_observations(duplicate.as_bytes(), b'\t'),
            Err(ObservationError::DuplicateOffspring { line: 2, .. })
        ));
    }

    #[test]
    fn test_trailing_delimiter() {
        let text = "fam\tkid1\t0\t1\t\nfam\tkid2\t1\t*\n";
        let families = parse_observations(text.as_bytes(), b'\t').unwrap();
        assert_eq!(families[0].num_markers(), 2);
        assert_eq!(families[0].get("kid1").unwrap(), &PhaseObservation::from_values(&[0, 1]));

        // only one empty field is forgiven, an empty call in the middle is still an error
        let gap = "fam\tkid1\t0\t\t1\n";
        assert!(matches!(
            parse_observations(gap.as_bytes(), b'\t'),
            Err(ObservationError::InvalidCall { marker: 1, .. })
        ));
        let two_trailing = "fam\tkid1\t0\t1\t\t\n";
        assert!(matches!(
            parse_observations(two_trailing.as_bytes(), b'\t'),
            Err(ObservationError::InvalidCall { marker: 2, .. })
        ));

        let no_calls = "fam\tkid1\t\n";
        assert!(matches!(
            parse_observations(no_calls.as_bytes(), b'\t'),
            Err(ObservationError::TooFewFields { found: 2, .. })
        ));
    }

    #[test]
    fn test_is_csv_path() {
        assert!(is_csv_path(Path::new("obs.csv")));
        assert!(is_csv_path(Path::new("obs.csv.gz")));
        assert!(!is_csv_path(Path::new("obs.tsv")));
        assert!(!is_csv_path(Path::new("obs.tsv.gz")));
        assert!(!is_csv_path(Path::new("obs")));
    }

    #[test]
    fn test_load_gzipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let filename = temp_dir.path().join("observations.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&filename).unwrap(), Compression::default());
        encoder.write_all(EXAMPLE_TSV.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let families = load_observations(&filename).unwrap();
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].num_offspring(), 4);

        let plain_filename = temp_dir.path().join("observations.tsv");
        std::fs::write(&plain_filename, EXAMPLE_TSV).unwrap();
        let plain_families = load_observations(&plain_filename).unwrap();
        assert_eq!(plain_families[0].get("T3"), families[0].get("T3"));
    }
}
