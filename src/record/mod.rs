mod value;

use std::collections::HashMap;
use std::fmt;

use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace};

use crate::error::{Result, VcfError};
use crate::filter::{FilterKind, VariantFilter};
use crate::genotype::{decompose, missing_genotype, Genotype};
use crate::types::{FieldNumber, HeaderRef, Sample, GENOTYPE_KEY, MISSING_VALUE, PASS};

/// Per-sample FORMAT values: key to the field's values, in FORMAT order.
pub type SampleValues = IndexMap<String, Vec<String>>;

const N_FIXED_COLUMNS: usize = 8;
const DEFAULT_PLOIDY: usize = 2;

/// One VCF data line, with INFO and FORMAT values kept as strings and converted on access
/// according to the header.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct Variant {
    sequence_name: String,
    #[getset(skip)]
    position: u64,
    id: String,
    ref_allele: String,
    alt: Vec<String>,
    /// `alleles[0]` is REF, `alleles[1..]` are ALT in order, so genotype indices can be used
    /// directly.
    alleles: Vec<String>,
    #[getset(skip)]
    allele_indices: HashMap<String, usize>,
    #[getset(skip)]
    quality: Option<f64>,
    filter: String,
    /// INFO entries in input order; flags have no values.
    info: IndexMap<String, Vec<String>>,
    format: Vec<String>,
    samples: HashMap<Sample, SampleValues>,
    sample_names: Vec<Sample>,
    output_sample_names: Vec<Sample>,
    header: HeaderRef,
}

impl Variant {
    /// An empty record bound to `header`; see [`Variant::parse`].
    pub fn new(header: HeaderRef) -> Self {
        Variant {
            sequence_name: String::new(),
            position: 0,
            id: MISSING_VALUE.into(),
            ref_allele: String::new(),
            alt: Vec::new(),
            alleles: Vec::new(),
            allele_indices: HashMap::new(),
            quality: None,
            filter: MISSING_VALUE.into(),
            info: IndexMap::new(),
            format: Vec::new(),
            samples: HashMap::new(),
            sample_names: header.samples.clone(),
            output_sample_names: header.samples.clone(),
            header,
        }
    }

    pub fn from_line(header: HeaderRef, line: &str) -> Result<Self> {
        let mut variant = Variant::new(header);
        variant.parse(line)?;
        Ok(variant)
    }

    /// 1-based position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// QUAL, `None` if missing.
    pub fn quality(&self) -> Option<f64> {
        self.quality
    }

    /// Replaces the contents of this record with one tab-delimited data line.
    ///
    /// Multi-valued fields are checked against their declared cardinality. On error the
    /// record is left unchanged.
    pub fn parse(&mut self, line: &str) -> Result<()> {
        let fields = line.trim_end_matches(&['\n', '\r'][..]).split('\t').collect_vec();
        if fields.len() < N_FIXED_COLUMNS {
            return Err(VcfError::MalformedRecord(format!(
                "expected at least {} columns, found {}",
                N_FIXED_COLUMNS,
                fields.len()
            )));
        }
        let position = fields[1]
            .parse::<u64>()
            .map_err(|_| VcfError::MalformedRecord(format!("invalid position {}", fields[1])))?;
        let quality = match fields[5] {
            MISSING_VALUE => None,
            q => Some(q.parse::<f64>().map_err(|_| {
                VcfError::MalformedRecord(format!("invalid quality {}", q))
            })?),
        };
        let alt = match fields[4] {
            MISSING_VALUE => vec![],
            alt => alt.split(',').map(str::to_owned).collect_vec(),
        };
        let (alleles, allele_indices) = index_alleles(fields[3], &alt)?;
        let info = self.parse_info(fields[7], alleles.len())?;

        let mut format = Vec::new();
        let mut samples = HashMap::new();
        let columns = &fields[N_FIXED_COLUMNS..];
        if columns.len() != self.sample_names.len() + 1
            && !(columns.is_empty() && self.sample_names.is_empty())
        {
            return Err(VcfError::MalformedRecord(format!(
                "expected {} samples, found {} columns after INFO",
                self.sample_names.len(),
                columns.len()
            )));
        }
        if let Some((keys, sample_columns)) = columns.split_first() {
            format = keys.split(':').map(str::to_owned).collect_vec();
            for (name, column) in self.sample_names.iter().zip(sample_columns) {
                let values = self.parse_sample(name, column, &format, alleles.len())?;
                samples.insert(name.clone(), values);
            }
        }

        self.sequence_name = fields[0].into();
        self.position = position;
        self.id = fields[2].into();
        self.ref_allele = fields[3].into();
        self.alt = alt;
        self.alleles = alleles;
        self.allele_indices = allele_indices;
        self.quality = quality;
        self.filter = fields[6].into();
        self.info = info;
        self.format = format;
        self.samples = samples;
        trace!("parsed {}:{}", self.sequence_name, self.position);
        Ok(())
    }

    fn parse_info(&self, field: &str, n_alleles: usize) -> Result<IndexMap<String, Vec<String>>> {
        let mut info = IndexMap::new();
        if field == MISSING_VALUE || field.is_empty() {
            return Ok(info);
        }
        for entry in field.split(';') {
            match entry.split_once('=') {
                Some((key, values)) => {
                    let values = values.split(',').map(str::to_owned).collect_vec();
                    check_cardinality(
                        key,
                        &values,
                        self.header.info_number(key),
                        n_alleles,
                        DEFAULT_PLOIDY,
                    )?;
                    info.insert(key.to_owned(), values);
                }
                None => {
                    info.insert(entry.to_owned(), Vec::new());
                }
            }
        }
        Ok(info)
    }

    fn parse_sample(
        &self,
        name: &str,
        column: &str,
        format: &[String],
        n_alleles: usize,
    ) -> Result<SampleValues> {
        let parts = column.split(':').collect_vec();
        if parts.len() > format.len() {
            return Err(VcfError::MalformedRecord(format!(
                "sample {} has {} values for {} FORMAT keys",
                name,
                parts.len(),
                format.len()
            )));
        }
        let mut ploidy = DEFAULT_PLOIDY;
        let mut values = SampleValues::new();
        for (key, part) in format.iter().zip(parts) {
            if key == GENOTYPE_KEY {
                ploidy = decompose(part)?.ploidy();
            }
            values.insert(key.clone(), part.split(',').map(str::to_owned).collect_vec());
        }
        for (key, v) in &values {
            check_cardinality(key, v, self.header.format_number(key), n_alleles, ploidy)?;
        }
        Ok(values)
    }

    pub fn has_sample(&self, sample: &str) -> bool {
        self.sample_names.iter().any(|s| s == sample)
    }

    pub fn sample(&self, sample: &str) -> Option<&SampleValues> {
        self.samples.get(sample)
    }

    /// The decomposed GT call of `sample`, `None` if it has no genotype.
    pub fn genotype(&self, sample: &str) -> Result<Option<Genotype>> {
        if !self.has_sample(sample) {
            return Err(VcfError::UnknownSample(sample.into()));
        }
        self.samples
            .get(sample)
            .and_then(|values| values.get(GENOTYPE_KEY))
            .and_then(|gt| gt.first())
            .map(|gt| decompose(gt))
            .transpose()
    }

    /// Index of `allele` in [`Variant::alleles`] (0 is REF).
    pub fn allele_index(&self, allele: &str) -> Option<usize> {
        self.allele_indices.get(allele).copied()
    }

    /// Index of `allele` in [`Variant::alt`], as used for allele-indexed filtering.
    pub fn alt_allele_index(&self, allele: &str) -> Option<usize> {
        self.allele_index(allele)
            .and_then(|index| index.checked_sub(1))
    }

    /// ALT as written in VCF.
    pub fn alt_string(&self) -> String {
        if self.alt.is_empty() {
            MISSING_VALUE.into()
        } else {
            self.alt.join(",")
        }
    }

    pub fn alleles_string(&self) -> String {
        self.alleles.join(",")
    }

    /// Replaces REF and ALT, keeping the allele index consistent.
    pub fn set_alleles(&mut self, ref_allele: &str, alt: Vec<String>) -> Result<()> {
        let (alleles, allele_indices) = index_alleles(ref_allele, &alt)?;
        self.ref_allele = ref_allele.into();
        self.alt = alt;
        self.alleles = alleles;
        self.allele_indices = allele_indices;
        Ok(())
    }

    /// Adds `tag` to FILTER, replacing a missing or `PASS` status.
    pub fn add_filter(&mut self, tag: &str) {
        if self.filter.is_empty() || self.filter == MISSING_VALUE || self.filter == PASS {
            self.filter = tag.into();
        } else {
            self.filter.push(';');
            self.filter.push_str(tag);
        }
    }

    pub fn set_info(&mut self, key: &str, values: Vec<String>) -> Result<()> {
        check_cardinality(
            key,
            &values,
            self.header.info_number(key),
            self.alleles.len(),
            DEFAULT_PLOIDY,
        )?;
        self.info.insert(key.into(), values);
        Ok(())
    }

    /// Sets or clears the INFO flag `key`. Setting keeps the position of an existing entry.
    pub fn set_info_flag(&mut self, key: &str, present: bool) {
        if present {
            self.info.entry(key.into()).or_default();
        } else {
            self.info.shift_remove(key);
        }
    }

    /// Appends `key` to the FORMAT keys if it is not there yet.
    pub fn add_format_field(&mut self, key: &str) {
        if !self.format.iter().any(|k| k == key) {
            self.format.push(key.into());
        }
    }

    /// Sets a FORMAT value of `sample`, adding `key` to the FORMAT keys if needed.
    pub fn set_sample_value(&mut self, sample: &str, key: &str, values: Vec<String>) -> Result<()> {
        if !self.has_sample(sample) {
            return Err(VcfError::UnknownSample(sample.into()));
        }
        let ploidy = if key == GENOTYPE_KEY {
            values
                .first()
                .map(|gt| decompose(gt))
                .transpose()?
                .map_or(DEFAULT_PLOIDY, |g| g.ploidy())
        } else {
            self.sample_ploidy(sample)
        };
        check_cardinality(
            key,
            &values,
            self.header.format_number(key),
            self.alleles.len(),
            ploidy,
        )?;
        self.add_format_field(key);
        self.samples
            .entry(sample.into())
            .or_default()
            .insert(key.into(), values);
        Ok(())
    }

    /// Restricts and/or reorders the samples written out, without touching the stored
    /// sample values.
    pub fn set_output_sample_names(&mut self, samples: Vec<Sample>) -> Result<()> {
        if let Some(unknown) = samples.iter().find(|s| !self.has_sample(s)) {
            return Err(VcfError::UnknownSample(unknown.clone()));
        }
        self.output_sample_names = samples;
        Ok(())
    }

    /// Sets the GT of every sample failing `filter` (at any alternate allele) to the missing
    /// call of the same ploidy. Other FORMAT values are kept.
    ///
    /// All samples are evaluated before the first genotype is rewritten, so an error leaves
    /// the record untouched. Returns the number of genotypes rewritten.
    pub fn remove_filtered_genotypes(&mut self, filter: &VariantFilter) -> Result<usize> {
        if filter.kind() != FilterKind::Sample {
            return Err(VcfError::WrongFilterKind {
                expected: filter.kind().to_string(),
            });
        }
        let mut failing = Vec::new();
        for sample in &self.sample_names {
            if !filter.passes(self, sample)? {
                failing.push(sample.clone());
            }
        }

        let mut removed = 0;
        for sample in &failing {
            let gt = self
                .samples
                .get_mut(sample)
                .and_then(|values| values.get_mut(GENOTYPE_KEY))
                .and_then(|gt| gt.first_mut());
            if let Some(gt) = gt {
                *gt = missing_genotype(gt);
                removed += 1;
            }
        }
        debug!(
            "{}:{} removed {} genotypes failing '{}'",
            self.sequence_name,
            self.position,
            removed,
            filter.spec()
        );
        Ok(removed)
    }

    fn sample_ploidy(&self, sample: &str) -> usize {
        match self.genotype(sample) {
            Ok(Some(genotype)) => genotype.ploidy(),
            _ => DEFAULT_PLOIDY,
        }
    }
}

fn index_alleles(
    ref_allele: &str,
    alt: &[String],
) -> Result<(Vec<String>, HashMap<String, usize>)> {
    let alleles = std::iter::once(ref_allele.to_owned())
        .chain(alt.iter().cloned())
        .collect_vec();
    let mut indices = HashMap::with_capacity(alleles.len());
    for (i, allele) in alleles.iter().enumerate() {
        if indices.insert(allele.clone(), i).is_some() {
            return Err(VcfError::MalformedRecord(format!("duplicate allele {}", allele)));
        }
    }
    Ok((alleles, indices))
}

fn check_cardinality(
    key: &str,
    values: &[String],
    number: Option<FieldNumber>,
    n_alleles: usize,
    ploidy: usize,
) -> Result<()> {
    if let [missing] = values {
        if missing == MISSING_VALUE {
            return Ok(());
        }
    }
    let expected = match number {
        Some(number) => number.expected_len(n_alleles, ploidy)?,
        None => None,
    };
    match expected {
        Some(expected) if expected != values.len() => Err(VcfError::CardinalityMismatch {
            key: key.into(),
            expected,
            found: values.len(),
        }),
        _ => Ok(()),
    }
}

impl fmt::Display for Variant {
    /// Writes the record as a VCF data line over the output samples.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quality = self
            .quality
            .map_or_else(|| MISSING_VALUE.to_owned(), |q| q.to_string());
        let info = self
            .info
            .iter()
            .map(|(key, values)| {
                if values.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, values.join(","))
                }
            })
            .join(";");
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.sequence_name,
            self.position,
            self.id,
            self.ref_allele,
            self.alt_string(),
            quality,
            self.filter,
            if info.is_empty() {
                MISSING_VALUE
            } else {
                info.as_str()
            }
        )?;
        if self.format.is_empty() {
            return Ok(());
        }
        write!(f, "\t{}", self.format.join(":"))?;
        for sample in &self.output_sample_names {
            let column = match self.samples.get(sample) {
                Some(values) => self
                    .format
                    .iter()
                    .map(|key| values.get(key).map_or(MISSING_VALUE.to_owned(), |v| v.join(",")))
                    .join(":"),
                None => MISSING_VALUE.to_owned(),
            };
            write!(f, "\t{}", column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{FieldInfo, FieldType, Header};
    use pretty_assertions::assert_eq;

    const LINE: &str = "20\t1110696\trs6040355\tA\tG,T\t67\tPASS\tNS=2;DP=10;AF=0.333,0.667;AA=T;DB\tGT:GQ:DP:HQ\t1|2:21:6:23,27\t2|1:2:0:18,2\t2/2:35:4";

    fn header() -> HeaderRef {
        let header: Header = "##INFO=<ID=NS,Number=1,Type=Integer,Description=\"Samples\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
##INFO=<ID=AA,Number=1,Type=String,Description=\"Ancestral Allele\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype Quality\">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read Depth\">
##FORMAT=<ID=HQ,Number=2,Type=Integer,Description=\"Haplotype Quality\">
##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred likelihoods\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA00001\tNA00002\tNA00003"
            .parse()
            .unwrap();
        HeaderRef::new(header)
    }

    #[test]
    fn test_parse() {
        let variant = Variant::from_line(header(), LINE).unwrap();
        assert_eq!(variant.sequence_name(), "20");
        assert_eq!(variant.position(), 1110696);
        assert_eq!(variant.id(), "rs6040355");
        assert_eq!(variant.alleles(), &vec!["A", "G", "T"]);
        assert_eq!(variant.alt(), &vec!["G", "T"]);
        assert_eq!(variant.quality(), Some(67.0));
        assert_eq!(variant.filter(), "PASS");
        assert_eq!(variant.info()["AF"], vec!["0.333", "0.667"]);
        assert_eq!(variant.info()["DB"], Vec::<String>::new());
        assert_eq!(variant.format(), &vec!["GT", "GQ", "DP", "HQ"]);
        assert_eq!(variant.sample("NA00001").unwrap()["HQ"], vec!["23", "27"]);
        // trailing fields may be dropped
        assert_eq!(variant.sample("NA00003").unwrap().get("HQ"), None);
        assert_eq!(variant.to_string(), LINE.replace("\t2/2:35:4", "\t2/2:35:4:."));
    }

    #[test]
    fn test_info_order_round_trips() {
        let line = LINE.replace(
            "NS=2;DP=10;AF=0.333,0.667;AA=T;DB",
            "DB;NS=2;DP=10;AF=0.333,0.667;AA=T",
        );
        let mut variant = Variant::from_line(header(), &line).unwrap();
        assert_eq!(variant.to_string(), line.replace("\t2/2:35:4", "\t2/2:35:4:."));
        variant.set_info_flag("DB", true);
        assert!(variant.to_string().contains("\tDB;NS=2;"));
        variant.set_info_flag("DB", false);
        assert!(variant.to_string().contains("\tNS=2;DP=10;AF=0.333,0.667;AA=T\t"));
    }

    #[test]
    fn test_genotype_count_overflow_is_an_error() {
        let alt = (1..40).map(|i| format!("A{}", "C".repeat(i))).join(",");
        let gt = vec!["0"; 40].join("/");
        let line = format!(
            "20\t1\t.\tA\t{}\t.\t.\t.\tGT:PL\t{}:0\t./.:.\t./.:.",
            alt, gt
        );
        assert!(matches!(
            Variant::from_line(header(), &line),
            Err(VcfError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_allele_index_is_inverse() {
        let variant = Variant::from_line(header(), LINE).unwrap();
        assert_eq!(variant.alleles().len(), variant.alt().len() + 1);
        for (i, allele) in variant.alleles().iter().enumerate() {
            assert_eq!(variant.allele_index(allele), Some(i));
        }
        assert_eq!(variant.alt_allele_index("T"), Some(1));
        assert_eq!(variant.alt_allele_index("A"), None);
        assert_eq!(variant.allele_index("C"), None);
        assert_eq!(variant.alt_string(), "G,T");
        assert_eq!(variant.alleles_string(), "A,G,T");
    }

    #[test]
    fn test_duplicate_alleles() {
        let line = LINE.replace("\tG,T\t", "\tG,G\t");
        assert!(matches!(
            Variant::from_line(header(), &line),
            Err(VcfError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_cardinality_is_checked() {
        let line = LINE.replace("AF=0.333,0.667", "AF=0.333");
        assert_eq!(
            Variant::from_line(header(), &line).unwrap_err(),
            VcfError::CardinalityMismatch {
                key: "AF".into(),
                expected: 2,
                found: 1
            }
        );
        let line = LINE.replace("AF=0.333,0.667", "AF=.");
        assert!(Variant::from_line(header(), &line).is_ok());
        let line = LINE.replace("23,27", "23");
        assert!(matches!(
            Variant::from_line(header(), &line),
            Err(VcfError::CardinalityMismatch { .. })
        ));
    }

    #[test]
    fn test_genotype_cardinality_follows_ploidy() {
        let line = LINE.replace("GT:GQ:DP:HQ", "GT:PL").replace(
            "\t1|2:21:6:23,27\t2|1:2:0:18,2\t2/2:35:4",
            "\t1|2:0,1,2,3,4,5\t2:0,1,2\t./.:.",
        );
        let variant = Variant::from_line(header(), &line).unwrap();
        assert_eq!(variant.sample("NA00002").unwrap()["PL"], vec!["0", "1", "2"]);
        let line = line.replace("\t2:0,1,2\t", "\t2/2:0,1,2\t");
        assert!(matches!(
            Variant::from_line(header(), &line),
            Err(VcfError::CardinalityMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(
            Variant::from_line(header(), "20\t1\t.\tA"),
            Err(VcfError::MalformedRecord(_))
        ));
        let line = LINE.replace("1110696", "12x");
        assert!(matches!(
            Variant::from_line(header(), &line),
            Err(VcfError::MalformedRecord(_))
        ));
        let line = LINE.replace("\t2/2:35:4", "");
        assert!(matches!(
            Variant::from_line(header(), &line),
            Err(VcfError::MalformedRecord(_))
        ));
        let line = LINE.replace("1|2:21", "1|x:21");
        assert_eq!(
            Variant::from_line(header(), &line).unwrap_err(),
            VcfError::MalformedGenotype("1|x".into())
        );
    }

    #[test]
    fn test_failed_parse_keeps_record() {
        let mut variant = Variant::from_line(header(), LINE).unwrap();
        let line = LINE.replace("AF=0.333,0.667", "AF=0.333");
        assert!(variant.parse(&line).is_err());
        assert_eq!(variant.to_string(), Variant::from_line(header(), LINE).unwrap().to_string());
    }

    #[test]
    fn test_edits() {
        let mut variant = Variant::from_line(header(), LINE).unwrap();
        variant.add_filter("q10");
        variant.add_filter("s50");
        assert_eq!(variant.filter(), "q10;s50");

        variant.set_info_flag("DB", false);
        variant.set_info("AF", vec!["0.1".into(), "0.2".into()]).unwrap();
        assert!(variant.set_info("AF", vec!["0.1".into()]).is_err());

        variant
            .set_sample_value("NA00003", "HQ", vec!["1".into(), "2".into()])
            .unwrap();
        variant
            .set_sample_value("NA00001", "FT", vec!["PASS".into()])
            .unwrap();
        assert_eq!(variant.format(), &vec!["GT", "GQ", "DP", "HQ", "FT"]);
        assert_eq!(
            variant.set_sample_value("NA00009", "DP", vec!["1".into()]),
            Err(VcfError::UnknownSample("NA00009".into()))
        );

        variant.set_alleles("A", vec!["C".into()]).unwrap();
        assert_eq!(variant.allele_index("C"), Some(1));
        assert_eq!(variant.allele_index("G"), None);
    }

    #[test]
    fn test_output_samples() {
        let mut variant = Variant::from_line(header(), LINE).unwrap();
        variant
            .set_output_sample_names(vec!["NA00003".into(), "NA00001".into()])
            .unwrap();
        assert!(variant.to_string().ends_with("\t2/2:35:4:.\t1|2:21:6:23,27"));
        assert_eq!(variant.sample_names().len(), 3);
        assert!(variant
            .set_output_sample_names(vec!["NA00004".into()])
            .is_err());
    }

    #[test]
    fn test_sites_only() {
        let mut header = Header::new();
        header.add_info(FieldInfo::new("DP", FieldNumber::Count(1), FieldType::Integer));
        let line = "1\t10\t.\tA\t.\t.\t.\t.";
        let variant = Variant::from_line(HeaderRef::new(header), line).unwrap();
        assert!(variant.alt().is_empty());
        assert_eq!(variant.quality(), None);
        assert_eq!(variant.to_string(), line);
    }
}
