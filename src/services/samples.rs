use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result, bail};
use rand::Rng;
use tracing::{info, warn};

use crate::data_structures::{PoolKind, TransactionRecord};

/// Pre-labelled example transactions of one kind.
#[derive(Debug, Clone)]
pub struct SamplePool {
    kind: PoolKind,
    records: Vec<TransactionRecord>,
}

impl SamplePool {
    pub fn load<P: AsRef<Path>>(kind: PoolKind, path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open {kind:?} samples file '{}'", path.display()))?;
        let pool = Self::from_reader(kind, file)
            .with_context(|| format!("failed to read samples from '{}'", path.display()))?;

        info!(kind = ?kind, path = %path.display(), rows = pool.len(), "Sample pool loaded");
        Ok(pool)
    }

    /// Rows that don't fit the record schema are skipped with a warning.
    pub fn from_reader<R: Read>(kind: PoolKind, reader: R) -> Result<Self> {
        let mut samples_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (idx, record_res) in samples_reader.deserialize::<TransactionRecord>().enumerate() {
            // we add 1 to the index because the first line is the header
            let row_number = idx + 1;
            match record_res {
                Ok(record) => records.push(record),
                Err(err) => warn!(kind = ?kind, row = row_number, error = %err, "Skipping sample row"),
            }
        }

        if records.is_empty() {
            bail!("{kind:?} sample pool has no usable rows");
        }

        Ok(Self { kind, records })
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Uniform pick; repeated calls are independent.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &TransactionRecord {
        // pools are never empty, see `from_reader`
        &self.records[rng.gen_range(0..self.records.len())]
    }
}

/// The fraud and legitimate example pools used by the demo actions.
#[derive(Debug, Clone)]
pub struct SampleProvider {
    fraud: SamplePool,
    legit: SamplePool,
}

impl SampleProvider {
    pub fn new(fraud: SamplePool, legit: SamplePool) -> Result<Self> {
        if fraud.kind() != PoolKind::Fraud || legit.kind() != PoolKind::Legit {
            bail!("sample pools were passed in the wrong order");
        }

        Ok(Self { fraud, legit })
    }

    pub fn load<P: AsRef<Path>>(fraud_path: P, legit_path: P) -> Result<Self> {
        Self::new(
            SamplePool::load(PoolKind::Fraud, fraud_path)?,
            SamplePool::load(PoolKind::Legit, legit_path)?,
        )
    }

    pub fn pool(&self, kind: PoolKind) -> &SamplePool {
        match kind {
            PoolKind::Fraud => &self.fraud,
            PoolKind::Legit => &self.legit,
        }
    }

    /// Returns an unencoded copy so it can be scored like manual input.
    pub fn sample_with<R: Rng + ?Sized>(&self, kind: PoolKind, rng: &mut R) -> TransactionRecord {
        self.pool(kind).sample_with(rng).clone()
    }

    pub fn sample(&self, kind: PoolKind) -> TransactionRecord {
        self.sample_with(kind, &mut rand::thread_rng())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    pub(crate) const FRAUD_CSV: &str = "\
merchant,category,amt,job,age,hour,day,month,gender,state,city_pop,lat,long,merch_lat,merch_long,is_fraud
fraud_Koepp-Parker,shopping_net,500.00,Naval architect,34,22,3,7,F,CA,12500,36.7783,-119.4179,36.9,-119.2,1
fraud_Towne-Koepp,grocery_pos,312.50,Engineer,61,1,19,12,M,TX,4200,31.9,-99.9,32.1,-99.5,1
fraud_Abbott-Rogahn,gas_transport,9.99,Engineer,27,3,28,2,F,NY,880000,40.7,-74.0,40.6,-74.2,1
";

    pub(crate) const LEGIT_CSV: &str = "\
merchant,category,amt,job,age,hour,day,month,gender,state,city_pop,lat,long,merch_lat,merch_long,is_fraud
fraud_Abbott-Rogahn,grocery_pos,42.10,Engineer,45,14,9,5,M,NY,880000,40.7,-74.0,40.71,-74.01,0
";

    pub(crate) fn provider() -> SampleProvider {
        SampleProvider::new(
            SamplePool::from_reader(PoolKind::Fraud, FRAUD_CSV.as_bytes()).unwrap(),
            SamplePool::from_reader(PoolKind::Legit, LEGIT_CSV.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_samples_come_from_the_pool() {
        let provider = provider();
        let pool = provider.pool(PoolKind::Fraud);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let sample = provider.sample_with(PoolKind::Fraud, &mut rng);
            assert!(pool.records.contains(&sample));
        }
    }

    #[test]
    fn test_sampling_reaches_every_row() {
        let provider = provider();
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = Vec::new();

        for _ in 0..200 {
            let sample = provider.sample_with(PoolKind::Fraud, &mut rng);
            if !seen.contains(&sample.merchant) {
                seen.push(sample.merchant);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_pools_are_kept_apart() {
        let provider = provider();
        let legit = provider.sample(PoolKind::Legit);

        assert_eq!(legit.category, "grocery_pos");
        assert_eq!(provider.pool(PoolKind::Legit).len(), 1);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let data = format!("{FRAUD_CSV}broken,row\n");
        let pool = SamplePool::from_reader(PoolKind::Fraud, data.as_bytes()).unwrap();

        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let header = FRAUD_CSV.lines().next().unwrap();
        assert!(SamplePool::from_reader(PoolKind::Legit, header.as_bytes()).is_err());
    }

    #[test]
    fn test_pools_in_wrong_order_are_rejected() {
        let fraud = SamplePool::from_reader(PoolKind::Fraud, FRAUD_CSV.as_bytes()).unwrap();
        let legit = SamplePool::from_reader(PoolKind::Legit, LEGIT_CSV.as_bytes()).unwrap();

        assert!(SampleProvider::new(legit, fraud).is_err());
    }
}
