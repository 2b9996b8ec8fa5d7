use polars::prelude::DataType;

pub const CHOLESTEROL: &str = "Cholesterol";
pub const TRIGLYCERIDES: &str = "Triglycerides";
pub const AGE: &str = "Age";
pub const SEX: &str = "Sex";
pub const COUNTRY: &str = "Country";
pub const CONTINENT: &str = "Continent";
pub const HEMISPHERE: &str = "Hemisphere";
pub const SMOKING: &str = "Smoking";
pub const HEART_ATTACK_RISK: &str = "Heart Attack Risk";

pub const CHOLESTEROL_CATEGORY: &str = "Cholesterol Category";
pub const TRIGLYCERIDES_CATEGORY: &str = "Triglycerides Category";
pub const AGE_GROUP: &str = "Age Group";

pub struct HeartRecord {}

impl HeartRecord {
    /// Columns the pipeline reads, with the dtype each one is normalized to
    /// after load. Every other column in the source is passed through.
    pub fn raw_columns() -> Vec<(&'static str, DataType)> {
        vec![
            (CHOLESTEROL, DataType::Float64),
            (TRIGLYCERIDES, DataType::Float64),
            (AGE, DataType::Float64),
            (SEX, DataType::Utf8),
            (COUNTRY, DataType::Utf8),
            (CONTINENT, DataType::Utf8),
            (HEMISPHERE, DataType::Utf8),
            (SMOKING, DataType::Float64),
            (HEART_ATTACK_RISK, DataType::Float64),
        ]
    }

    pub fn required_columns() -> Vec<&'static str> {
        Self::raw_columns().into_iter().map(|(name, _)| name).collect()
    }

    /// Columns appended by bucketing.
    pub fn derived_columns() -> Vec<&'static str> {
        vec![CHOLESTEROL_CATEGORY, TRIGLYCERIDES_CATEGORY, AGE_GROUP]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_columns_are_unique() {
        let mut columns = HeartRecord::required_columns();
        let before = columns.len();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), before);
        assert_eq!(before, 9);
    }

    #[test]
    fn derived_columns_do_not_shadow_source_columns() {
        let required = HeartRecord::required_columns();
        for derived in HeartRecord::derived_columns() {
            assert!(!required.contains(&derived));
        }
    }
}
