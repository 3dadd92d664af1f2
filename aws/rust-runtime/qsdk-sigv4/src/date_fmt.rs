/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Date formats used in the SigV4 credential scope and the `x-amz-date` header

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::time::SystemTime;

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, thiserror::Error)]
#[error("failed to parse date: {0}")]
pub struct ParseError(#[from] chrono::ParseError);

/// Formats a chrono `DateTime<Utc>` in `YYYYMMDD` format.
pub fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(DATE_FORMAT).to_string()
}

/// Formats a chrono `DateTime<Utc>` in `YYYYMMDD'T'HHMMSS'Z'` format.
pub fn format_date_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(DATE_TIME_FORMAT)
        .to_string()
}

/// Parses `YYYYMMDD'T'HHMMSS'Z'` formatted dates into a `SystemTime`.
pub fn parse_date_time(date_time_str: &str) -> Result<SystemTime, ParseError> {
    let date_time = NaiveDateTime::parse_from_str(date_time_str, DATE_TIME_FORMAT)?;
    Ok(Utc.from_utc_datetime(&date_time).into())
}

/// Parses `YYYYMMDD` formatted dates into a `NaiveDate`.
pub fn parse_date(date_str: &str) -> Result<NaiveDate, ParseError> {
    Ok(NaiveDate::parse_from_str(date_str, DATE_FORMAT)?)
}
