//! Campaign draft validation.
//!
//! A fixed, ordered list of pure checks run on every create and update.
//! Each check is independently testable; the first failure wins.

use crate::error::{AdError, AdResult};
use crate::types::CampaignDraft;

pub const MAX_AGE: u8 = 100;

/// All draft checks, in the order they run.
pub const CAMPAIGN_VALIDATORS: &[fn(&CampaignDraft) -> AdResult<()>] = &[
    validate_title,
    validate_limits,
    validate_costs,
    validate_duration,
    validate_age_bounds,
    validate_targeting_location,
];

/// Run every check against the draft, failing on the first violation.
pub fn validate_campaign_draft(draft: &CampaignDraft) -> AdResult<()> {
    for check in CAMPAIGN_VALIDATORS {
        check(draft)?;
    }
    Ok(())
}

pub fn validate_title(draft: &CampaignDraft) -> AdResult<()> {
    if draft.ad_title.trim().is_empty() {
        return Err(AdError::Validation("ad_title cannot be blank".into()));
    }
    Ok(())
}

pub fn validate_limits(draft: &CampaignDraft) -> AdResult<()> {
    if draft.clicks_limit > draft.impressions_limit {
        return Err(AdError::Validation(
            "clicks_limit can't be greater than impressions_limit".into(),
        ));
    }
    Ok(())
}

pub fn validate_costs(draft: &CampaignDraft) -> AdResult<()> {
    // `!(x >= 0.0)` also rejects NaN.
    if !(draft.cost_per_impression >= 0.0) || !(draft.cost_per_click >= 0.0) {
        return Err(AdError::Validation(
            "per-unit costs must be non-negative".into(),
        ));
    }
    Ok(())
}

pub fn validate_duration(draft: &CampaignDraft) -> AdResult<()> {
    if draft.start_date > draft.end_date {
        return Err(AdError::Validation(
            "start_date can't be greater than end_date".into(),
        ));
    }
    Ok(())
}

pub fn validate_age_bounds(draft: &CampaignDraft) -> AdResult<()> {
    let targeting = &draft.targeting;
    if targeting.age_from.is_some_and(|age| age > MAX_AGE)
        || targeting.age_to.is_some_and(|age| age > MAX_AGE)
    {
        return Err(AdError::Validation(format!(
            "targeting ages must be within 0..={MAX_AGE}"
        )));
    }
    if let (Some(from), Some(to)) = (targeting.age_from, targeting.age_to) {
        if from > to {
            return Err(AdError::Validation(
                "age_from can't be greater than age_to".into(),
            ));
        }
    }
    Ok(())
}

pub fn validate_targeting_location(draft: &CampaignDraft) -> AdResult<()> {
    if draft
        .targeting
        .location
        .as_deref()
        .is_some_and(|location| location.is_empty())
    {
        return Err(AdError::Validation(
            "targeting.location cannot be blank".into(),
        ));
    }
    Ok(())
}
