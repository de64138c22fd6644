use dealspot_common::{DealspotError, ListingDefinition, Result};

use super::schedule::{expand, Expansion};

/// Check the caller-supplied fields, then expand. Nothing is persisted for a
/// definition that fails here.
pub fn validate_definition(definition: &ListingDefinition) -> Result<Expansion> {
    if definition.title.trim().is_empty() {
        return Err(DealspotError::validation("title is required"));
    }
    for (field, value) in [
        ("old_price", definition.old_price),
        ("new_price", definition.new_price),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(DealspotError::validation(format!(
                "{field} must be a non-negative amount, got {value}"
            )));
        }
    }
    if !(0.0..=100.0).contains(&definition.discount) {
        return Err(DealspotError::validation(format!(
            "discount must be a percentage, got {}",
            definition.discount
        )));
    }
    if definition
        .dietary_restrictions
        .iter()
        .any(|tag| tag.trim().is_empty())
    {
        return Err(DealspotError::validation("dietary restriction tags cannot be blank"));
    }

    expand(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_definition;

    #[test]
    fn accepts_sample() {
        assert_eq!(validate_definition(&sample_definition()).unwrap().len(), 1);
    }

    #[test]
    fn rejects_blank_title_and_negative_price() {
        let mut def = sample_definition();
        def.title = "   ".to_string();
        assert!(matches!(validate_definition(&def), Err(DealspotError::Validation(_))));

        let mut def = sample_definition();
        def.new_price = -1.0;
        assert!(matches!(validate_definition(&def), Err(DealspotError::Validation(_))));

        let mut def = sample_definition();
        def.discount = 150.0;
        assert!(matches!(validate_definition(&def), Err(DealspotError::Validation(_))));
    }
}
