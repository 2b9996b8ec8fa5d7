//! Fixed tables that parameterize the pipeline: bucket thresholds and labels,
//! and the key orders that fixed-order charts are reindexed onto.

use crate::aggregate::FixedKey;
use crate::buckets::Bucketer;
use crate::error::Result;
use crate::records;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketTable {
    pub source: &'static str,
    pub target: &'static str,
    pub boundaries: &'static [f64],
    pub labels: &'static [&'static str],
}

impl BucketTable {
    pub fn bucketer(&self) -> Result<Bucketer> {
        Bucketer::new(self.target, self.boundaries.to_vec(), self.labels.to_vec())
    }

    /// The labels as a reindexing order.
    pub fn fixed_keys(&self) -> Vec<FixedKey> {
        self.labels.iter().map(|label| FixedKey::new(*label)).collect()
    }
}

pub const CHOLESTEROL_BUCKETS: BucketTable = BucketTable {
    source: records::CHOLESTEROL,
    target: records::CHOLESTEROL_CATEGORY,
    boundaries: &[0.0, 200.0, 239.0, f64::INFINITY],
    labels: &["Normal", "Borderline High", "High"],
};

pub const TRIGLYCERIDES_BUCKETS: BucketTable = BucketTable {
    source: records::TRIGLYCERIDES,
    target: records::TRIGLYCERIDES_CATEGORY,
    boundaries: &[0.0, 150.0, 199.0, 499.0, f64::INFINITY],
    labels: &["Normal", "Borderline", "High", "Very High"],
};

pub const AGE_BUCKETS: BucketTable = BucketTable {
    source: records::AGE,
    target: records::AGE_GROUP,
    boundaries: &[20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0],
    labels: &[
        "21-30", "31-40", "41-50", "51-60", "61-70", "71-80", "81-90", "91+",
    ],
};

pub const BUCKET_TABLES: [BucketTable; 3] = [CHOLESTEROL_BUCKETS, TRIGLYCERIDES_BUCKETS, AGE_BUCKETS];

pub const ASIAN_COUNTRIES: &[&str] = &["South Korea", "Thailand", "China", "Vietnam", "Japan", "India"];

/// Smoking flag value and the label it is charted under.
pub const SMOKING_GROUPS: &[(&str, &str)] = &[("0", "Non-Smoker"), ("1", "Smoker")];

pub fn asian_country_keys() -> Vec<FixedKey> {
    ASIAN_COUNTRIES.iter().map(|country| FixedKey::new(*country)).collect()
}

pub fn smoking_keys() -> Vec<FixedKey> {
    SMOKING_GROUPS
        .iter()
        .map(|(flag, label)| FixedKey::labelled(*flag, *label))
        .collect()
}
