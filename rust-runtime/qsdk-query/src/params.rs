/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::{QueryValueWriter, QueryWriteError, QueryWriter, SerializeQuery};

/// A value inside [`QueryParams`]
#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    List(Vec<QueryValue>),
    Struct(Vec<(String, QueryValue)>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::String(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::String(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Boolean(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Untyped operation input
///
/// Lets callers invoke any operation by name without a generated input type. Lists are written
/// the way the client's [`QueryFlavor`](crate::QueryFlavor) requires.
///
/// ```rust
/// use qsdk_query::{QueryFlavor, QueryParams, QueryWriter, SerializeQuery};
///
/// let params = QueryParams::new()
///     .param("DryRun", true)
///     .param("RegionName", vec!["us-east-1", "us-west-2"]);
/// let mut out = String::new();
/// let mut writer = QueryWriter::new(&mut out, QueryFlavor::Ec2, "DescribeRegions", "2016-11-15");
/// params.serialize_query(&mut writer).unwrap();
/// assert_eq!(
///     out,
///     "Action=DescribeRegions&Version=2016-11-15&DryRun=true&RegionName.1=us-east-1&RegionName.2=us-west-2"
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams {
    members: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn write_value(writer: QueryValueWriter<'_>, value: &QueryValue) -> Result<(), QueryWriteError> {
    match value {
        QueryValue::String(s) => writer.string(s),
        QueryValue::Boolean(b) => writer.boolean(*b),
        QueryValue::Integer(i) => writer.integer(*i),
        QueryValue::List(values) => {
            let mut list = writer.start_list(None);
            for value in values {
                write_value(list.entry(), value)?;
            }
            list.finish();
        }
        QueryValue::Struct(members) => {
            let mut writer = writer;
            for (name, value) in members {
                check_name(name)?;
                write_value(writer.prefix(name), value)?;
            }
        }
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), QueryWriteError> {
    if name.is_empty() {
        return Err(QueryWriteError::invalid_field(name, "parameter names cannot be empty"));
    }
    if name.contains(|c: char| c == '&' || c == '=') {
        return Err(QueryWriteError::invalid_field(
            name,
            "parameter names cannot contain `&` or `=`",
        ));
    }
    Ok(())
}

impl SerializeQuery for QueryParams {
    fn serialize_query(&self, writer: &mut QueryWriter<'_>) -> Result<(), QueryWriteError> {
        for (name, value) in &self.members {
            check_name(name)?;
            write_value(writer.prefix(name), value)?;
        }
        Ok(())
    }
}
