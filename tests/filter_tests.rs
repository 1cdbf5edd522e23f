use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use vcf_filter::genotype::decompose;
use vcf_filter::{FilterKind, Header, HeaderRef, Variant, VariantFilter, VcfError};

const EXAMPLE: &str = "resources/example.vcf";

struct Example {
    header: HeaderRef,
    records: Vec<String>,
}

impl Example {
    fn variant(&self, i: usize) -> Variant {
        Variant::from_line(self.header.clone(), &self.records[i]).unwrap()
    }

    fn filter(&self, spec: &str, kind: FilterKind) -> VariantFilter {
        VariantFilter::from_header(spec, kind, &self.header).unwrap()
    }
}

#[fixture]
fn example() -> Example {
    let text = std::fs::read_to_string(EXAMPLE).unwrap();
    let (header, records): (Vec<&str>, Vec<&str>) =
        text.lines().partition(|l| l.starts_with('#'));
    let header: Header = header.join("\n").parse().unwrap();
    Example {
        header: HeaderRef::new(header),
        records: records.into_iter().map(String::from).collect(),
    }
}

#[rstest]
fn test_every_example_record_parses(example: Example) {
    assert_eq!(example.variant(0).to_string(), example.records[0]);
    assert_eq!(example.variant(4).to_string(), example.records[4]);
    for i in 0..example.records.len() {
        // dropped trailing sample fields are written back as missing
        let written = example.variant(i).to_string();
        let reparsed = Variant::from_line(example.header.clone(), &written).unwrap();
        assert_eq!(reparsed.to_string(), written);
    }
}

#[rstest]
#[case("DP > 10", vec![true, true, false, true, false])]
#[case("DP > 10 & DB", vec![true, false, false, false, false])]
#[case("QUAL > 20 & FILTER = FILTER", vec![true, false, true, true, true])]
#[case("( NS + 1 ) * 2 = 8", vec![true, true, false, true, true])]
#[case("! H2 | DP < 10", vec![false, true, true, true, true])]
fn test_record_filters(example: Example, #[case] spec: &str, #[case] expected: Vec<bool>) {
    let filter = example.filter(spec, FilterKind::Record);
    let passes = (0..example.records.len())
        .map(|i| filter.passes_record(&example.variant(i)).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(passes, expected);
}

#[rstest]
fn test_depth_scenario(example: Example) {
    let filter = example.filter("DP > 10", FilterKind::Record);
    let line = &example.records[0];
    let deep = Variant::from_line(example.header.clone(), &line.replace("DP=14", "DP=15")).unwrap();
    let shallow = Variant::from_line(example.header.clone(), &line.replace("DP=14", "DP=5")).unwrap();
    assert!(filter.passes_record(&deep).unwrap());
    assert!(!filter.passes_record(&shallow).unwrap());
}

#[test]
fn test_per_allele_scenario() {
    let header: Header = "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AF,Number=A,Type=Float,Description=\"Allele fraction\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1"
        .parse()
        .unwrap();
    let header = HeaderRef::new(header);
    let variant =
        Variant::from_line(header.clone(), "1\t5\t.\tA\tC,G\t.\t.\t.\tGT:AF\t1/2:0.1,0.9").unwrap();
    let filter = VariantFilter::from_header("AF > 0.5", FilterKind::Sample, &header).unwrap();
    assert!(!filter.passes(&variant, "S1").unwrap());
    assert!(!filter.passes_allele(&variant, "S1", 0).unwrap());
    assert!(filter.passes_allele(&variant, "S1", 1).unwrap());
}

#[rstest]
fn test_evaluation_does_not_mutate(example: Example) {
    let record = example.filter("DP > 10 & ( AF < 0.5 | DB )", FilterKind::Record);
    let sample = example.filter("GQ > 40 & DP > 3", FilterKind::Sample);
    for i in 0..example.records.len() {
        let variant = example.variant(i);
        let before = variant.to_string();
        let _ = record.passes_record(&variant);
        for name in example.header.samples() {
            let _ = sample.passes(&variant, name);
        }
        assert_eq!(variant.to_string(), before);
    }
}

#[rstest]
fn test_remove_filtered_genotypes(example: Example) {
    let filter = example.filter("GQ > 40 & DP > 3", FilterKind::Sample);
    let mut variant = example.variant(0);
    assert_eq!(filter.remove_filtered_genotypes(&mut variant).unwrap(), 1);
    assert_eq!(
        variant.to_string().split('\t').skip(9).collect::<Vec<_>>(),
        vec![".|.:48:1:51,51", "1|0:48:8:51,51", "1/1:43:5:.,."]
    );
    assert!(variant.genotype("NA00001").unwrap().unwrap().is_null());
    assert!(!decompose("1|0").unwrap().is_null());
}

#[rstest]
fn test_remove_filtered_genotypes_is_idempotent(example: Example) {
    let filter = example.filter("GQ > 40", FilterKind::Sample);
    for i in 0..example.records.len() {
        let mut once = example.variant(i);
        once.remove_filtered_genotypes(&filter).unwrap();
        let mut twice = once.clone();
        twice.remove_filtered_genotypes(&filter).unwrap();
        assert_eq!(twice.to_string(), once.to_string());
    }
}

#[rstest]
fn test_remove_filtered_genotypes_needs_sample_filter(example: Example) {
    let filter = example.filter("DP > 10", FilterKind::Record);
    let mut variant = example.variant(0);
    let before = variant.to_string();
    assert!(matches!(
        variant.remove_filtered_genotypes(&filter),
        Err(VcfError::WrongFilterKind { .. })
    ));
    assert_eq!(variant.to_string(), before);
}

#[rstest]
#[case("(DB & H2")]
#[case("DB & H2 )")]
fn test_unbalanced_parentheses(example: Example, #[case] spec: &str) {
    assert!(matches!(
        VariantFilter::from_header(spec, FilterKind::Record, &example.header),
        Err(VcfError::UnbalancedParentheses { .. })
    ));
}

#[rstest]
fn test_unknown_identifier(example: Example) {
    assert_eq!(
        VariantFilter::from_header("FOO > 3", FilterKind::Record, &example.header).unwrap_err(),
        VcfError::UnrecognizedOperand {
            lexeme: "FOO".into(),
            position: 0
        }
    );
    // PASS is a FILTER value, not a declared field
    assert!(VariantFilter::from_header("FILTER = PASS", FilterKind::Record, &example.header).is_err());
}

#[rstest]
fn test_filter_shared_across_threads(example: Example) {
    let filter = example.filter("DP > 10", FilterKind::Record);
    let records = example.records.clone();
    let expected = vec![true, true, false, true, false];
    std::thread::scope(|scope| {
        for (i, line) in records.iter().enumerate() {
            let filter = &filter;
            let expected = expected[i];
            let header: Header = (*example.header).clone();
            scope.spawn(move || {
                let variant = Variant::from_line(HeaderRef::new(header), line).unwrap();
                assert_eq!(filter.passes_record(&variant).unwrap(), expected);
            });
        }
    });
}
