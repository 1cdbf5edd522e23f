//! Typed access to INFO and FORMAT values.
//!
//! Values are looked up either as a whole (the field must then hold exactly one value)
//! or at an alternate allele, in which case the field's declared cardinality decides
//! which of its values belongs to that allele. `Ok(None)` means the value is missing.

use crate::error::{Result, VcfError};
use crate::genotype::{genotype_count, genotype_ordinal};
use crate::record::{Variant, DEFAULT_PLOIDY};
use crate::types::{FieldNumber, FILTER_KEY, MISSING_VALUE, QUAL_KEY};

fn to_float(key: &str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| VcfError::InvalidValue {
        key: key.into(),
        value: value.into(),
        kind: "a number".into(),
    })
}

impl Variant {
    fn info_values(&self, key: &str) -> Result<(Option<&[String]>, FieldNumber)> {
        let number = self
            .header
            .info_number(key)
            .ok_or_else(|| VcfError::UnknownField(key.into()))?;
        Ok((self.info.get(key).map(Vec::as_slice), number))
    }

    fn sample_values(&self, key: &str, sample: &str) -> Result<(Option<&[String]>, FieldNumber)> {
        let number = self
            .header
            .format_number(key)
            .ok_or_else(|| VcfError::UnknownField(key.into()))?;
        if !self.has_sample(sample) {
            return Err(VcfError::UnknownSample(sample.into()));
        }
        let values = self
            .samples
            .get(sample)
            .and_then(|values| values.get(key))
            .map(Vec::as_slice);
        Ok((values, number))
    }

    /// Picks the value of `key` belonging to alternate allele `allele`, or its only value.
    fn select<'a>(
        &self,
        key: &str,
        values: &'a [String],
        number: FieldNumber,
        allele: Option<usize>,
        ploidy: usize,
    ) -> Result<Option<&'a str>> {
        if let [only] = values {
            if only == MISSING_VALUE {
                return Ok(None);
            }
        }
        let position = match allele {
            None if values.len() > 1 => return Err(VcfError::MultiValued(key.into())),
            None => 0,
            Some(i) if i >= self.alt.len() => {
                return Err(VcfError::IndexOutOfRange {
                    key: key.into(),
                    index: i,
                })
            }
            Some(i) => match number {
                FieldNumber::AlternateAlleles => i,
                FieldNumber::Alleles => i + 1,
                // the homozygous call of allele i + 1
                FieldNumber::Genotypes if ploidy == 2 => genotype_ordinal(i + 1, i + 1),
                FieldNumber::Genotypes => match genotype_count(i + 2, ploidy) {
                    Some(count) => count - 1,
                    None => {
                        return Err(VcfError::IndexOutOfRange {
                            key: key.into(),
                            index: i,
                        })
                    }
                },
                FieldNumber::Count(_) | FieldNumber::Unknown if values.len() > 1 => {
                    return Err(VcfError::MultiValued(key.into()))
                }
                FieldNumber::Count(_) | FieldNumber::Unknown => 0,
            },
        };
        match values.get(position) {
            Some(v) if v == MISSING_VALUE => Ok(None),
            Some(v) => Ok(Some(v.as_str())),
            None if values.is_empty() => Ok(None),
            None => Err(VcfError::IndexOutOfRange {
                key: key.into(),
                index: allele.unwrap_or(0),
            }),
        }
    }

    /// Like [`Variant::select`], but a multi-valued field read as a whole is joined with `,`.
    fn select_string(
        &self,
        key: &str,
        values: &[String],
        number: FieldNumber,
        allele: Option<usize>,
        ploidy: usize,
    ) -> Result<Option<String>> {
        if allele.is_none() && values.len() > 1 {
            return Ok(Some(values.join(",")));
        }
        Ok(self
            .select(key, values, number, allele, ploidy)?
            .map(str::to_owned))
    }

    /// Numeric INFO value. `QUAL` reads the quality column.
    pub fn info_value_float(&self, key: &str, allele: Option<usize>) -> Result<Option<f64>> {
        if key == QUAL_KEY {
            return Ok(self.quality);
        }
        match self.info_values(key)? {
            (Some(values), number) => self
                .select(key, values, number, allele, DEFAULT_PLOIDY)?
                .map(|v| to_float(key, v))
                .transpose(),
            (None, _) => Ok(None),
        }
    }

    /// String INFO value. `FILTER` reads the filter column.
    pub fn info_value_string(&self, key: &str, allele: Option<usize>) -> Result<Option<String>> {
        if key == FILTER_KEY {
            return Ok(Some(self.filter.clone()).filter(|f| f != MISSING_VALUE));
        }
        match self.info_values(key)? {
            (Some(values), number) => {
                self.select_string(key, values, number, allele, DEFAULT_PLOIDY)
            }
            (None, _) => Ok(None),
        }
    }

    /// Whether the INFO flag `key` is set. An absent flag is `false`, never missing.
    pub fn info_value_bool(&self, key: &str) -> Result<bool> {
        self.info_values(key)?;
        Ok(self.info.contains_key(key))
    }

    pub fn sample_value_float(
        &self,
        key: &str,
        sample: &str,
        allele: Option<usize>,
    ) -> Result<Option<f64>> {
        match self.sample_values(key, sample)? {
            (Some(values), number) => self
                .select(key, values, number, allele, self.sample_ploidy(sample))?
                .map(|v| to_float(key, v))
                .transpose(),
            (None, _) => Ok(None),
        }
    }

    pub fn sample_value_string(
        &self,
        key: &str,
        sample: &str,
        allele: Option<usize>,
    ) -> Result<Option<String>> {
        match self.sample_values(key, sample)? {
            (Some(values), number) => {
                self.select_string(key, values, number, allele, self.sample_ploidy(sample))
            }
            (None, _) => Ok(None),
        }
    }

    /// Whether `sample` has a non-missing value for `key`.
    pub fn sample_value_bool(&self, key: &str, sample: &str) -> Result<bool> {
        Ok(match self.sample_values(key, sample)? {
            (Some([only]), _) => only != MISSING_VALUE,
            (Some(values), _) => !values.is_empty(),
            (None, _) => false,
        })
    }

    /// [`Variant::info_value_float`] without a sample, [`Variant::sample_value_float`] with one.
    pub fn value_float(
        &self,
        key: &str,
        sample: Option<&str>,
        allele: Option<usize>,
    ) -> Result<Option<f64>> {
        match sample {
            Some(sample) => self.sample_value_float(key, sample, allele),
            None => self.info_value_float(key, allele),
        }
    }

    pub fn value_string(
        &self,
        key: &str,
        sample: Option<&str>,
        allele: Option<usize>,
    ) -> Result<Option<String>> {
        match sample {
            Some(sample) => self.sample_value_string(key, sample, allele),
            None => self.info_value_string(key, allele),
        }
    }

    pub fn value_bool(&self, key: &str, sample: Option<&str>) -> Result<bool> {
        match sample {
            Some(sample) => self.sample_value_bool(key, sample),
            None => self.info_value_bool(key),
        }
    }
}
