use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::domain::Sample;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub samples: Vec<Sample>,
    /// Trailing file left over when the folder holds an odd number of files.
    pub unpaired: Option<Utf8PathBuf>,
}

/// Sorts the listing once and pairs neighbours: (1, 2), (3, 4), ...
pub fn pair_samples(folder: &Utf8Path, mut names: Vec<String>) -> Result<Pairing, PipelineError> {
    names.sort();

    let mut samples = Vec::with_capacity(names.len() / 2);
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (offset, pair) in names.chunks_exact(2).enumerate() {
        let index = offset + 1;
        let sample = Sample::new(index, folder.join(&pair[0]), folder.join(&pair[1]))?;
        if let Some(previous) = seen.insert(sample.derived_name.clone(), index) {
            return Err(PipelineError::InvalidInput(format!(
                "samples {previous} and {index} both resolve to the name {}",
                sample.derived_name
            )));
        }
        info!(
            sample = index,
            name = %sample.derived_name,
            forward = %sample.forward,
            reverse = %sample.reverse,
            "paired reads"
        );
        samples.push(sample);
    }

    let unpaired = names
        .chunks_exact(2)
        .remainder()
        .first()
        .map(|name| folder.join(name));
    if let Some(file) = &unpaired {
        warn!(file = %file, "odd number of input files; last file is not part of any sample");
    }

    if samples.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "no read pairs found in {folder}"
        )));
    }

    Ok(Pairing { samples, unpaired })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_in_sorted_order() {
        let names = vec![
            "b_R2.fq".to_string(),
            "a_R1.fq".to_string(),
            "b_R1.fq".to_string(),
            "a_R2.fq".to_string(),
        ];
        let pairing = pair_samples(Utf8Path::new("in"), names).unwrap();
        assert_eq!(pairing.samples.len(), 2);
        assert_eq!(pairing.samples[0].forward, Utf8PathBuf::from("in/a_R1.fq"));
        assert_eq!(pairing.samples[0].reverse, Utf8PathBuf::from("in/a_R2.fq"));
        assert_eq!(pairing.samples[1].derived_name, "b_R2");
        assert_eq!(pairing.samples[1].index, 2);
        assert!(pairing.unpaired.is_none());
    }
}
