//! Property tests for the masking and validation invariants

use lakehouse_core::masking::{mask_mrn, mask_name, mask_ssn, mask_zip};
use lakehouse_core::resource::{Address, HumanName, Identifier};
use lakehouse_core::{
    transform_to_silver, BronzeResource, FixedClock, PipelineContext, TransformSettings,
};
use proptest::prelude::*;
use serde_json::json;

fn ctx() -> PipelineContext<FixedClock> {
    PipelineContext::with_clock(
        FixedClock::at_date(2024, 1, 31).unwrap(),
        TransformSettings::default(),
    )
}

proptest! {
    #[test]
    fn ssn_mask_is_eleven_chars_with_input_tail(ssn in "[0-9]{3}-?[0-9]{2}-?[0-9]{4}") {
        prop_assume!(ssn.len() == 9 || ssn.len() == 11);
        let masked = mask_ssn(Some(&ssn)).unwrap().unwrap();
        prop_assert_eq!(masked.len(), 11);
        prop_assert!(masked.starts_with("***-**-"));
        prop_assert_eq!(&masked[7..], &ssn[ssn.len() - 4..]);
    }

    #[test]
    fn zip_mask_is_three_chars(code in "\\PC{3,12}") {
        let address = vec![Address {
            postal_code: Some(code.clone()),
            ..Default::default()
        }];
        let region = mask_zip(Some(address.as_slice())).unwrap();
        prop_assert_eq!(region.chars().count(), 3);
        prop_assert!(code.starts_with(&region));
    }

    #[test]
    fn mrn_mask_hides_all_but_four(value in "[A-Z0-9]{4,20}") {
        let masked = mask_mrn(&[Identifier { value: Some(value.clone()), ..Default::default() }]).unwrap();
        prop_assert_eq!(masked.len(), 7);
        prop_assert!(value.ends_with(&masked[3..]));
    }

    #[test]
    fn name_mask_keeps_only_initial(given in "[A-Za-z]{2,12}", family in "[A-Za-z]{1,12}") {
        let names = vec![HumanName {
            family: Some(family.clone()),
            given: vec![given.clone()],
            ..Default::default()
        }];
        let masked = mask_name(&names).unwrap();
        prop_assert_eq!(masked, format!("{}. {}", &given[..1], family));
    }

    #[test]
    fn dropped_records_are_conserved(
        years in proptest::collection::vec(1850i32..2100, 1..30),
        genders in proptest::collection::vec(prop::sample::select(vec!["male", "female", "other", "unknown", "robot", "Male"]), 30),
    ) {
        let batch: Vec<BronzeResource> = years
            .iter()
            .enumerate()
            .map(|(i, year)| {
                BronzeResource::from_value(json!({
                    "resourceType": "Patient",
                    "id": format!("{}", 1000 + i),
                    "name": [{"family": "Smith", "given": ["John"]}],
                    "birthDate": format!("{:04}-06-01", year),
                    "gender": genders[i],
                    "identifier": [{"value": format!("MRN{:06}", 1000 + i)}]
                }))
                .unwrap()
            })
            .collect();

        let silver = transform_to_silver(&ctx(), &batch).unwrap();
        prop_assert!(silver.summary.is_conserved());
        prop_assert_eq!(
            silver.validation.initial,
            silver.validation.final_count + silver.validation.dropped
        );
        prop_assert_eq!(silver.patients.len(), silver.validation.final_count);
        for record in &silver.patients {
            prop_assert!(record.birth_year >= 1900 && record.birth_year <= 2024);
            prop_assert_eq!(record.zip_region.as_str(), "UNK");
        }
    }
}
