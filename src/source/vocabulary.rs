//! Upstream status vocabularies and what they mean to us.

use crate::status::StatusLevel;

/// Statuspage-style pages: page indicators plus per-component statuses.
pub const STATUSPAGE: &[(&str, StatusLevel)] = &[
	("none", StatusLevel::Operational),
	("minor", StatusLevel::DegradedPerformance),
	("major", StatusLevel::PartialOutage),
	("critical", StatusLevel::MajorOutage),
	("maintenance", StatusLevel::UnderMaintenance),
	("operational", StatusLevel::Operational),
	("degraded_performance", StatusLevel::DegradedPerformance),
	("partial_outage", StatusLevel::PartialOutage),
	("major_outage", StatusLevel::MajorOutage),
	("under_maintenance", StatusLevel::UnderMaintenance),
];

/// Keyword categories for pages that only offer prose. Earlier categories win.
pub const KEYWORDS: &[(StatusLevel, &[&str])] = &[
	(
		StatusLevel::Operational,
		&["operational", "online", "running", "active", "normal"],
	),
	(
		StatusLevel::DegradedPerformance,
		&["degraded", "slow", "issues", "problems"],
	),
	(
		StatusLevel::PartialOutage,
		&["outage", "down", "offline", "unavailable", "error"],
	),
	(
		StatusLevel::UnderMaintenance,
		&["maintenance", "scheduled", "updating"],
	),
];
