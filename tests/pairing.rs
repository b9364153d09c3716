use std::collections::HashSet;

use assert_matches::assert_matches;
use camino::Utf8Path;

use mymlst::error::PipelineError;
use mymlst::pairing::pair_samples;

fn listing(n: usize) -> Vec<String> {
    (0..n).rev().map(|i| format!("s{i:02}.fastq.gz")).collect()
}

#[test]
fn pairs_floor_half_and_uses_disjoint_files() {
    for n in 2..=9 {
        let pairing = pair_samples(Utf8Path::new("reads"), listing(n)).unwrap();
        assert_eq!(pairing.samples.len(), n / 2, "n = {n}");

        let used = pairing
            .samples
            .iter()
            .flat_map(|sample| [sample.forward.clone(), sample.reverse.clone()])
            .collect::<HashSet<_>>();
        assert_eq!(used.len(), 2 * (n / 2));

        match pairing.unpaired {
            Some(file) => {
                assert_eq!(n % 2, 1);
                assert!(!used.contains(&file));
            }
            None => assert_eq!(n % 2, 0),
        }
    }
}

#[test]
fn indexes_follow_sorted_order() {
    let pairing = pair_samples(Utf8Path::new("reads"), listing(6)).unwrap();
    let indexes = pairing.samples.iter().map(|s| s.index).collect::<Vec<_>>();
    assert_eq!(indexes, vec![1, 2, 3]);
    assert_eq!(pairing.samples[0].forward, "reads/s00.fastq.gz");
    assert_eq!(pairing.samples[0].derived_name, "s01");
    assert_eq!(pairing.samples[2].derived_name, "s05");
}

#[test]
fn too_few_files() {
    for n in 0..2 {
        assert_matches!(
            pair_samples(Utf8Path::new("reads"), listing(n)),
            Err(PipelineError::InvalidInput(_))
        );
    }
}

#[test]
fn colliding_names_are_rejected() {
    let names = vec![
        "a.fq".to_string(),
        "m.fastq".to_string(),
        "m.fastq.gz".to_string(),
        "m.fq".to_string(),
    ];
    let err = pair_samples(Utf8Path::new("reads"), names).unwrap_err();
    assert_matches!(err, PipelineError::InvalidInput(message) if message.contains("both resolve"));
}

#[test]
fn distinct_names_pass() {
    let names = vec![
        "x_R1.fq".to_string(),
        "x_R2.fq".to_string(),
        "y_R1.fq.gz".to_string(),
        "y_R2.fq.gz".to_string(),
    ];
    let pairing = pair_samples(Utf8Path::new("reads"), names).unwrap();
    let names = pairing
        .samples
        .iter()
        .map(|sample| sample.derived_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["x_R2", "y_R2"]);
}
