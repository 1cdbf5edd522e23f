use std::collections::HashMap;
use std::convert::TryFrom;
#[cfg(not(feature = "sync"))]
use std::rc::Rc;
use std::str::FromStr;
#[cfg(feature = "sync")]
use std::sync::Arc;

use getset::Getters;
use indexmap::IndexMap;
use log::warn;
use multimap::MultiMap;
use strum::{Display, EnumString};

use crate::error::{Result, VcfError};
use crate::filter::FilterKind;
use crate::genotype::genotype_count;
use crate::parser;

pub(crate) const MISSING_VALUE: &str = ".";
pub(crate) const GENOTYPE_KEY: &str = "GT";
pub(crate) const QUAL_KEY: &str = "QUAL";
pub(crate) const FILTER_KEY: &str = "FILTER";
pub(crate) const PASS: &str = "PASS";

/// Field key to declared type, the registry a filter spec is compiled against.
pub type FieldTypes = HashMap<String, FieldType>;

pub type Sample = String;

/// Shared handle records keep on their header.
#[cfg(not(feature = "sync"))]
pub type HeaderRef = Rc<Header>;
#[cfg(feature = "sync")]
pub type HeaderRef = Arc<Header>;

/// Declared value type of an INFO or FORMAT field (`Type=` in the header).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum FieldType {
    Float,
    Integer,
    #[strum(serialize = "Flag")]
    Boolean,
    #[strum(to_string = "String", serialize = "Character")]
    String,
    Unknown,
}

impl FieldType {
    /// Maps a header `Type=` value, falling back to `Unknown` for anything unexpected.
    pub fn from_header(kind: &str) -> Self {
        FieldType::from_str(kind).unwrap_or_else(|_| {
            warn!("unknown field type {}, treating it as Unknown", kind);
            FieldType::Unknown
        })
    }
}

/// Declared cardinality of a field (`Number=` in the header).
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum FieldNumber {
    Count(usize),
    /// `A`: one value per alternate allele
    AlternateAlleles,
    /// `R`: one value per allele, reference included
    Alleles,
    /// `G`: one value per possible genotype
    Genotypes,
    /// `.`
    Unknown,
}

impl FieldNumber {
    /// Number of values a field with this cardinality must carry at a locus with
    /// `n_alleles` alleles (reference included), or `None` if any count is acceptable.
    /// Fails if the number of genotypes is too large to represent.
    pub fn expected_len(&self, n_alleles: usize, ploidy: usize) -> Result<Option<usize>> {
        Ok(match *self {
            FieldNumber::Count(0) | FieldNumber::Unknown => None,
            FieldNumber::Count(n) => Some(n),
            FieldNumber::AlternateAlleles => Some(n_alleles.saturating_sub(1)),
            FieldNumber::Alleles => Some(n_alleles),
            FieldNumber::Genotypes => Some(genotype_count(n_alleles, ploidy).ok_or_else(|| {
                VcfError::MalformedRecord(format!(
                    "too many genotypes for {} alleles at ploidy {}",
                    n_alleles, ploidy
                ))
            })?),
        })
    }
}

impl FromStr for FieldNumber {
    type Err = VcfError;

    fn from_str(s: &str) -> Result<Self> {
        parser::field_number(s)
    }
}

#[derive(Debug, Getters, Clone, PartialEq)]
#[getset(get = "pub")]
pub struct FieldInfo {
    id: String,
    number: FieldNumber,
    kind: FieldType,
    description: String,
}

impl FieldInfo {
    pub fn new(id: &str, number: FieldNumber, kind: FieldType) -> Self {
        FieldInfo {
            id: id.into(),
            number,
            kind,
            description: String::new(),
        }
    }
}

impl<'a> TryFrom<Vec<(&'a str, &'a str)>> for FieldInfo {
    type Error = VcfError;

    fn try_from(data: Vec<(&'a str, &'a str)>) -> Result<Self> {
        let mut h: HashMap<_, _> = data.into_iter().collect();
        let mut required = |key: &str| {
            h.remove(key)
                .ok_or_else(|| VcfError::MalformedHeader(format!("missing {}", key)))
        };
        let id = required("ID")?;
        let number = required("Number")?;
        let kind = required("Type")?;
        Ok(FieldInfo {
            id: id.into(),
            number: number.parse()?,
            kind: FieldType::from_header(kind),
            description: h.remove("Description").unwrap_or("").into(),
        })
    }
}

/// The metadata a record is read against: INFO and FORMAT declarations plus sample names.
#[derive(Debug, Clone, Default, Getters)]
#[getset(get = "pub")]
pub struct Header {
    pub(crate) meta: MultiMap<String, String>,
    pub(crate) info: IndexMap<String, FieldInfo>,
    pub(crate) format: IndexMap<String, FieldInfo>,
    pub(crate) samples: Vec<Sample>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_info(&mut self, info: FieldInfo) {
        self.info.insert(info.id.clone(), info);
    }

    pub fn add_format(&mut self, format: FieldInfo) {
        self.format.insert(format.id.clone(), format);
    }

    pub fn set_samples(&mut self, samples: Vec<Sample>) {
        self.samples = samples;
    }

    pub fn info_type(&self, key: &str) -> Option<FieldType> {
        self.info.get(key).map(|i| i.kind)
    }

    pub fn format_type(&self, key: &str) -> Option<FieldType> {
        self.format.get(key).map(|f| f.kind)
    }

    pub fn info_number(&self, key: &str) -> Option<FieldNumber> {
        self.info.get(key).map(|i| i.number)
    }

    pub fn format_number(&self, key: &str) -> Option<FieldNumber> {
        self.format.get(key).map(|f| f.number)
    }

    pub fn info_types(&self) -> FieldTypes {
        self.info.iter().map(|(k, i)| (k.clone(), i.kind)).collect()
    }

    pub fn format_types(&self) -> FieldTypes {
        self.format.iter().map(|(k, f)| (k.clone(), f.kind)).collect()
    }

    /// The identifiers a filter of the given kind may reference. Record filters also see
    /// the `QUAL` and `FILTER` columns.
    pub fn variables(&self, kind: FilterKind) -> FieldTypes {
        match kind {
            FilterKind::Record => {
                let mut variables = self.info_types();
                variables.insert(QUAL_KEY.into(), FieldType::Float);
                variables.insert(FILTER_KEY.into(), FieldType::String);
                variables
            }
            FilterKind::Sample => self.format_types(),
        }
    }
}

impl FromStr for Header {
    type Err = VcfError;

    /// Reads the `##` meta lines and the `#CHROM` line of a VCF.
    fn from_str(s: &str) -> Result<Self> {
        let mut header = Header::new();
        for line in s.lines().filter(|l| !l.trim().is_empty()) {
            header.add_line(line)?;
        }
        Ok(header)
    }
}

impl Header {
    /// Adds one header line, either a `##key=value` meta line or the `#CHROM` column line.
    pub fn add_line(&mut self, line: &str) -> Result<()> {
        if line.starts_with("##") {
            let (key, value) = parser::meta_line(line)?;
            match key {
                "INFO" => self.add_info(FieldInfo::try_from(parser::structured_value(value)?)?),
                "FORMAT" => {
                    self.add_format(FieldInfo::try_from(parser::structured_value(value)?)?)
                }
                _ => self.meta.insert(key.into(), value.into()),
            }
            Ok(())
        } else if line.starts_with("#CHROM") {
            self.samples = line.split('\t').skip(9).map(str::to_owned).collect();
            Ok(())
        } else {
            Err(VcfError::MalformedHeader(line.into()))
        }
    }
}
