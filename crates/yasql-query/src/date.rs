//! Date expression parser.
//!
//! Uses chumsky for parser combinators. A date expression is a sentinel
//! followed by a body:
//!
//! ```text
//! dt | 2020-03                      calendar month interval
//! dt | since last month until 3 days ago
//! ts | in last 2 weeks              epoch seconds
//! ```
//!
//! Years and months expand to their half-open calendar interval; a full
//! date or date-time is a single instant. Relative forms are evaluated
//! against a [`DateContext`] so that one expression never reads the clock
//! twice.

use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use chumsky::prelude::*;
use regex::Regex;

use crate::ast::Literal;
use crate::config::RenderConfig;
use crate::error::{ParseError, ParseErrorKind, RenderError};

type ParserInput<'a> = &'a str;
type ParserExtra<'a> = extra::Err<Rich<'a, char>>;

static SENTINEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(dt|datetime|ts|timestamp)\s+\|").expect("sentinel pattern is valid")
});

/// Canonical text form of a date-time.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How an evaluated expression is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// `dt |` / `datetime |`: `YYYY-MM-DD HH:MM:SS` text.
    Date,
    /// `ts |` / `timestamp |`: integer epoch seconds.
    Timestamp,
}

/// Calendar unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Day.
    Day,
    /// Week, starting on Monday.
    Week,
    /// Calendar month.
    Month,
    /// Calendar year.
    Year,
}

/// A single point or period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTerm {
    /// `YYYY`.
    Year(i32),
    /// `YYYY-MM`.
    Month(i32, u32),
    /// `YYYY-MM-DD`.
    Day(NaiveDate),
    /// `YYYY-MM-DD HH:MM:SS`.
    Time(NaiveDateTime),
    /// `today`, `this week`, `this month`, `this year`.
    Current(Unit),
    /// `yesterday`, `last week`, `last month`, `last year`.
    Previous(Unit),
    /// `N units ago`.
    Ago(u32, Unit),
}

/// The part of an expression after the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBody {
    /// A bare term.
    Alone(DateTerm),
    /// `since X`.
    Since(DateTerm),
    /// `since X until Y`.
    SinceUntil(DateTerm, DateTerm),
    /// `in last N units`.
    InLast(u32, Unit),
}

/// A parsed date expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateExpr {
    /// Output form.
    pub sentinel: Sentinel,
    /// The expression proper.
    pub body: DateBody,
}

/// Value of a date expression.
///
/// Intervals are half-open `[start, end)`; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateResult<T = NaiveDateTime> {
    /// A single point in time.
    Instant(T),
    /// A range of time.
    Interval {
        /// Inclusive lower bound.
        start: Option<T>,
        /// Exclusive upper bound.
        end: Option<T>,
    },
}

impl<T> DateResult<T> {
    /// The instant itself, or the interval's lower bound.
    pub const fn start(&self) -> Option<&T> {
        match self {
            Self::Instant(t) => Some(t),
            Self::Interval { start, .. } => start.as_ref(),
        }
    }

    /// Convert every bound, failing on the first error.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<DateResult<U>, E> {
        Ok(match self {
            Self::Instant(t) => DateResult::Instant(f(t)?),
            Self::Interval { start, end } => DateResult::Interval {
                start: start.map(&mut f).transpose()?,
                end: end.map(&mut f).transpose()?,
            },
        })
    }
}

/// Clock reading and timezone for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    /// Local wall time that relative forms count from.
    pub now: NaiveDateTime,
    /// Timezone for epoch conversion.
    pub timezone: Tz,
}

impl DateContext {
    /// Create a context.
    pub const fn new(now: NaiveDateTime, timezone: Tz) -> Self {
        Self { now, timezone }
    }

    /// Read the configured clock once.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.clock.now(config.timezone), config.timezone)
    }
}

/// Whether a string is meant as a date expression.
pub fn is_date_expr(text: &str) -> bool {
    SENTINEL_RE.is_match(text)
}

/// Parse a date expression.
///
/// # Errors
///
/// Returns a `ParseError` if the expression is malformed.
pub fn parse_expr(source: &str) -> Result<DateExpr, ParseError> {
    let (result, errs) = expr_parser()
        .then_ignore(ws())
        .then_ignore(end())
        .parse(source)
        .into_output_errors();

    if let Some(expr) = result {
        Ok(expr)
    } else {
        let err = errs.first().map(|e| {
            let kind = if e.found().is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::SyntaxError(e.to_string())
            };
            ParseError::new(kind, e.span().start, source)
        });
        Err(err.unwrap_or_else(|| ParseError::new(ParseErrorKind::UnexpectedEof, 0, source)))
    }
}

/// Parse and evaluate an expression, leaving bounds as local date-times.
pub fn parse(source: &str, ctx: &DateContext) -> Result<(Sentinel, DateResult), ParseError> {
    let expr = parse_expr(source)?;
    let result = expr
        .evaluate(ctx.now)
        .ok_or_else(|| ParseError::new(ParseErrorKind::OutOfRange, 0, source))?;
    Ok((expr.sentinel, result))
}

/// Parse, evaluate and render an expression as SQL literals.
pub fn resolve(source: &str, ctx: &DateContext) -> Result<DateResult<Literal>, RenderError> {
    let (sentinel, result) = parse(source, ctx)?;
    result.try_map(|t| sentinel.literal(t, ctx.timezone))
}

impl Sentinel {
    /// Render a local date-time in this sentinel's form.
    pub fn literal(self, t: NaiveDateTime, timezone: Tz) -> Result<Literal, RenderError> {
        match self {
            Self::Date => Ok(Literal::String(t.format(DATETIME_FORMAT).to_string())),
            Self::Timestamp => timezone
                .from_local_datetime(&t)
                .earliest()
                .map(|local| Literal::Integer(local.timestamp()))
                .ok_or_else(|| {
                    RenderError::Timezone(format!(
                        "{} does not exist in {timezone}",
                        t.format(DATETIME_FORMAT)
                    ))
                }),
        }
    }
}

impl DateExpr {
    /// Evaluate against a clock reading.
    ///
    /// Returns `None` when a bound falls outside the representable range.
    pub fn evaluate(&self, now: NaiveDateTime) -> Option<DateResult> {
        match self.body {
            DateBody::Alone(term) => term.evaluate(now),
            DateBody::Since(from) => Some(DateResult::Interval {
                start: Some(*from.evaluate(now)?.start()?),
                end: None,
            }),
            DateBody::SinceUntil(from, until) => Some(DateResult::Interval {
                start: Some(*from.evaluate(now)?.start()?),
                end: Some(*until.evaluate(now)?.start()?),
            }),
            DateBody::InLast(n, unit) => Some(DateResult::Interval {
                start: Some(sub_units(now, unit, n)?),
                end: Some(now),
            }),
        }
    }
}

impl DateTerm {
    /// Evaluate against a clock reading.
    pub fn evaluate(&self, now: NaiveDateTime) -> Option<DateResult> {
        match *self {
            Self::Year(year) => {
                let start = midnight(NaiveDate::from_ymd_opt(year, 1, 1)?);
                period(start, Unit::Year)
            }
            Self::Month(year, month) => {
                let start = midnight(NaiveDate::from_ymd_opt(year, month, 1)?);
                period(start, Unit::Month)
            }
            Self::Day(date) => Some(DateResult::Instant(midnight(date))),
            Self::Time(t) => Some(DateResult::Instant(t)),
            Self::Current(unit) => period(midnight(period_start(now.date(), unit)?), unit),
            Self::Previous(unit) => {
                let end = midnight(period_start(now.date(), unit)?);
                period(sub_units(end, unit, 1)?, unit)
            }
            Self::Ago(n, unit) => Some(DateResult::Instant(sub_units(now, unit, n)?)),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn period(start: NaiveDateTime, unit: Unit) -> Option<DateResult> {
    Some(DateResult::Interval {
        start: Some(start),
        end: Some(add_units(start, unit, 1)?),
    })
}

fn period_start(date: NaiveDate, unit: Unit) -> Option<NaiveDate> {
    match unit {
        Unit::Day => Some(date),
        Unit::Week => {
            date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        }
        Unit::Month => date.with_day(1),
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    }
}

fn add_units(t: NaiveDateTime, unit: Unit, n: u32) -> Option<NaiveDateTime> {
    match unit {
        Unit::Day => t.checked_add_days(Days::new(u64::from(n))),
        Unit::Week => t.checked_add_days(Days::new(u64::from(n) * 7)),
        Unit::Month => t.checked_add_months(Months::new(n)),
        Unit::Year => t.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

fn sub_units(t: NaiveDateTime, unit: Unit, n: u32) -> Option<NaiveDateTime> {
    match unit {
        Unit::Day => t.checked_sub_days(Days::new(u64::from(n))),
        Unit::Week => t.checked_sub_days(Days::new(u64::from(n) * 7)),
        Unit::Month => t.checked_sub_months(Months::new(n)),
        Unit::Year => t.checked_sub_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Parse whitespace (spaces, tabs, newlines).
fn ws<'a>() -> impl Parser<'a, ParserInput<'a>, (), ParserExtra<'a>> + Clone {
    one_of(" \t\r\n").repeated().ignored()
}

/// Parse required whitespace.
fn ws1<'a>() -> impl Parser<'a, ParserInput<'a>, (), ParserExtra<'a>> + Clone {
    one_of(" \t\r\n").repeated().at_least(1).ignored()
}

/// Keyword parser.
fn kw<'a>(keyword: &'static str) -> impl Parser<'a, ParserInput<'a>, (), ParserExtra<'a>> + Clone {
    text::keyword(keyword).ignored()
}

/// Parse digits.
fn digits<'a>() -> impl Parser<'a, ParserInput<'a>, &'a str, ParserExtra<'a>> + Clone {
    one_of("0123456789").repeated().at_least(1).to_slice()
}

/// Parse a count.
fn count<'a>() -> impl Parser<'a, ParserInput<'a>, u32, ParserExtra<'a>> + Clone {
    digits().try_map(|s: &str, span| {
        s.parse::<u32>()
            .map_err(|_| Rich::custom(span, "invalid count"))
    })
}

/// Parse a unit, singular or plural.
fn unit<'a>() -> impl Parser<'a, ParserInput<'a>, Unit, ParserExtra<'a>> + Clone {
    text::ident().try_map(|s: &str, span| match s {
        "day" | "days" => Ok(Unit::Day),
        "week" | "weeks" => Ok(Unit::Week),
        "month" | "months" => Ok(Unit::Month),
        "year" | "years" => Ok(Unit::Year),
        other => Err(Rich::custom(span, format!("unknown unit `{other}`"))),
    })
}

/// Parse the unit after `this` / `last`.
fn calendar_unit<'a>() -> impl Parser<'a, ParserInput<'a>, Unit, ParserExtra<'a>> + Clone {
    choice((
        kw("week").to(Unit::Week),
        kw("month").to(Unit::Month),
        kw("year").to(Unit::Year),
    ))
}

/// Parse a fixed-width number field.
fn field<'a>(s: &str, width: usize, what: &str, span: SimpleSpan) -> Result<u32, Rich<'a, char>> {
    if s.len() != width {
        return Err(Rich::custom(span, format!("invalid {what}")));
    }
    s.parse().map_err(|_| Rich::custom(span, format!("invalid {what}")))
}

/// Parse a time of day (HH:MM:SS).
fn time_of_day<'a>() -> impl Parser<'a, ParserInput<'a>, NaiveTime, ParserExtra<'a>> + Clone {
    digits()
        .then_ignore(just(':'))
        .then(digits())
        .then_ignore(just(':'))
        .then(digits())
        .try_map(|((hour, minute), second): ((&str, &str), &str), span| {
            let hour = field(hour, 2, "hour", span)?;
            let minute = field(minute, 2, "minute", span)?;
            let second = field(second, 2, "second", span)?;
            NaiveTime::from_hms_opt(hour, minute, second)
                .ok_or_else(|| Rich::custom(span, "invalid time"))
        })
}

/// Parse an absolute date: YYYY, YYYY-MM, YYYY-MM-DD or YYYY-MM-DD HH:MM:SS.
fn absolute<'a>() -> impl Parser<'a, ParserInput<'a>, DateTerm, ParserExtra<'a>> + Clone {
    let day_part = just('-')
        .ignore_then(digits())
        .then(ws1().ignore_then(time_of_day()).or_not());
    digits()
        .then(just('-').ignore_then(digits()).then(day_part.or_not()).or_not())
        .try_map(|(year, rest), span| {
            let year = field(year, 4, "year", span)? as i32;
            let Some((month, day)) = rest else {
                return Ok(DateTerm::Year(year));
            };
            let month = field(month, 2, "month", span)?;
            let Some((day, time)) = day else {
                if !(1..=12).contains(&month) {
                    return Err(Rich::custom(span, "invalid month"));
                }
                return Ok(DateTerm::Month(year, month));
            };
            let day = field(day, 2, "day", span)?;
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| Rich::custom(span, "invalid date"))?;
            Ok(match time {
                Some(time) => DateTerm::Time(date.and_time(time)),
                None => DateTerm::Day(date),
            })
        })
}

/// Parse a single point or period.
fn term<'a>() -> impl Parser<'a, ParserInput<'a>, DateTerm, ParserExtra<'a>> + Clone {
    let ago = count()
        .then_ignore(ws())
        .then(unit())
        .then_ignore(ws1())
        .then_ignore(kw("ago"))
        .map(|(n, unit)| DateTerm::Ago(n, unit));

    choice((
        ago,
        absolute(),
        kw("today").to(DateTerm::Current(Unit::Day)),
        kw("yesterday").to(DateTerm::Previous(Unit::Day)),
        kw("this")
            .ignore_then(ws1())
            .ignore_then(calendar_unit())
            .map(DateTerm::Current),
        kw("last")
            .ignore_then(ws1())
            .ignore_then(calendar_unit())
            .map(DateTerm::Previous),
    ))
}

/// Parse the body after the sentinel.
fn body<'a>() -> impl Parser<'a, ParserInput<'a>, DateBody, ParserExtra<'a>> + Clone {
    let since = kw("since")
        .ignore_then(ws1())
        .ignore_then(term())
        .then(
            ws1()
                .ignore_then(kw("until"))
                .ignore_then(ws1())
                .ignore_then(term())
                .or_not(),
        )
        .map(|(from, until)| match until {
            Some(until) => DateBody::SinceUntil(from, until),
            None => DateBody::Since(from),
        });

    let in_last = kw("in")
        .ignore_then(ws1())
        .ignore_then(kw("last"))
        .ignore_then(ws1())
        .ignore_then(count())
        .then_ignore(ws())
        .then(unit())
        .map(|(n, unit)| DateBody::InLast(n, unit));

    choice((since, in_last, term().map(DateBody::Alone)))
}

/// Parse a full expression.
fn expr_parser<'a>() -> impl Parser<'a, ParserInput<'a>, DateExpr, ParserExtra<'a>> {
    let sentinel = choice((
        kw("datetime").to(Sentinel::Date),
        kw("dt").to(Sentinel::Date),
        kw("timestamp").to(Sentinel::Timestamp),
        kw("ts").to(Sentinel::Timestamp),
    ));

    ws().ignore_then(sentinel)
        .then_ignore(ws())
        .then_ignore(just('|'))
        .then_ignore(ws())
        .then(body())
        .map(|(sentinel, body)| DateExpr { sentinel, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    /// Wednesday, 2018-08-15 10:00:00.
    fn ctx() -> DateContext {
        DateContext::new(at(2018, 8, 15, 10, 0, 0), Tz::UTC)
    }

    fn eval(source: &str) -> DateResult {
        parse(source, &ctx()).unwrap().1
    }

    fn interval(start: NaiveDateTime, end: NaiveDateTime) -> DateResult {
        DateResult::Interval {
            start: Some(start),
            end: Some(end),
        }
    }

    #[test]
    fn test_is_date_expr() {
        assert!(is_date_expr("dt | 2020"));
        assert!(is_date_expr("timestamp  | today"));
        assert!(!is_date_expr("dt| 2020"));
        assert!(!is_date_expr("paid"));
        assert!(!is_date_expr("dtx | 2020"));
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(parse_expr("dt | today").unwrap().sentinel, Sentinel::Date);
        assert_eq!(parse_expr("datetime | today").unwrap().sentinel, Sentinel::Date);
        assert_eq!(parse_expr("ts | today").unwrap().sentinel, Sentinel::Timestamp);
        assert_eq!(parse_expr("timestamp | today").unwrap().sentinel, Sentinel::Timestamp);
    }

    #[test]
    fn test_year_and_month_are_intervals() {
        assert_eq!(eval("dt | 2020"), interval(at(2020, 1, 1, 0, 0, 0), at(2021, 1, 1, 0, 0, 0)));
        assert_eq!(eval("dt | 2020-03"), interval(at(2020, 3, 1, 0, 0, 0), at(2020, 4, 1, 0, 0, 0)));
        assert_eq!(eval("dt | 2020-12"), interval(at(2020, 12, 1, 0, 0, 0), at(2021, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_full_date_is_instant() {
        assert_eq!(eval("dt | 2018-01-01"), DateResult::Instant(at(2018, 1, 1, 0, 0, 0)));
        assert_eq!(
            eval("dt | 2018-01-01 12:30:05"),
            DateResult::Instant(at(2018, 1, 1, 12, 30, 5))
        );
    }

    #[test]
    fn test_current_periods() {
        assert_eq!(eval("dt | today"), interval(at(2018, 8, 15, 0, 0, 0), at(2018, 8, 16, 0, 0, 0)));
        assert_eq!(eval("dt | this week"), interval(at(2018, 8, 13, 0, 0, 0), at(2018, 8, 20, 0, 0, 0)));
        assert_eq!(eval("dt | this month"), interval(at(2018, 8, 1, 0, 0, 0), at(2018, 9, 1, 0, 0, 0)));
        assert_eq!(eval("dt | this year"), interval(at(2018, 1, 1, 0, 0, 0), at(2019, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_previous_periods() {
        assert_eq!(eval("dt | yesterday"), interval(at(2018, 8, 14, 0, 0, 0), at(2018, 8, 15, 0, 0, 0)));
        assert_eq!(eval("dt | last week"), interval(at(2018, 8, 6, 0, 0, 0), at(2018, 8, 13, 0, 0, 0)));
        assert_eq!(eval("dt | last month"), interval(at(2018, 7, 1, 0, 0, 0), at(2018, 8, 1, 0, 0, 0)));
        assert_eq!(eval("dt | last year"), interval(at(2017, 1, 1, 0, 0, 0), at(2018, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_ago_is_exact() {
        assert_eq!(eval("dt | 3 days ago"), DateResult::Instant(at(2018, 8, 12, 10, 0, 0)));
        assert_eq!(eval("dt | 1 week ago"), DateResult::Instant(at(2018, 8, 8, 10, 0, 0)));
        assert_eq!(eval("dt | 2 months ago"), DateResult::Instant(at(2018, 6, 15, 10, 0, 0)));
        assert_eq!(eval("dt | 1 year ago"), DateResult::Instant(at(2017, 8, 15, 10, 0, 0)));
    }

    #[test]
    fn test_month_arithmetic_clamps_to_month_end() {
        let ctx = DateContext::new(at(2018, 3, 31, 8, 0, 0), Tz::UTC);
        let (_, result) = parse("dt | 1 month ago", &ctx).unwrap();
        assert_eq!(result, DateResult::Instant(at(2018, 2, 28, 8, 0, 0)));
    }

    #[test]
    fn test_since_and_until_use_term_starts() {
        assert_eq!(
            eval("dt | since last month"),
            DateResult::Interval {
                start: Some(at(2018, 7, 1, 0, 0, 0)),
                end: None
            }
        );
        assert_eq!(
            eval("dt | since last month until 3 days ago"),
            interval(at(2018, 7, 1, 0, 0, 0), at(2018, 8, 12, 10, 0, 0))
        );
        assert_eq!(
            eval("dt | since 2018-01-01 until 2018-07-15"),
            interval(at(2018, 1, 1, 0, 0, 0), at(2018, 7, 15, 0, 0, 0))
        );
        assert_eq!(
            eval("dt | since 2017 until 2018"),
            interval(at(2017, 1, 1, 0, 0, 0), at(2018, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_in_last() {
        assert_eq!(
            eval("ts | in last 2 weeks"),
            interval(at(2018, 8, 1, 10, 0, 0), at(2018, 8, 15, 10, 0, 0))
        );
        assert_eq!(
            eval("dt | in last 1 day"),
            interval(at(2018, 8, 14, 10, 0, 0), at(2018, 8, 15, 10, 0, 0))
        );
    }

    #[test]
    fn test_whitespace_is_free() {
        assert_eq!(eval("dt |2020"), eval("dt | 2020"));
        assert_eq!(eval("  dt   |   in   last   7days  "), eval("dt | in last 7 days"));
    }

    #[test]
    fn test_resolve_timestamps_in_utc() {
        let resolved = resolve("ts | in last 2 weeks", &ctx()).unwrap();
        assert_eq!(
            resolved,
            DateResult::Interval {
                start: Some(Literal::Integer(1_533_117_600)),
                end: Some(Literal::Integer(1_534_327_200)),
            }
        );
    }

    #[test]
    fn test_resolve_timestamps_follow_timezone() {
        let ctx = DateContext::new(at(2018, 8, 15, 10, 0, 0), chrono_tz::Asia::Shanghai);
        let resolved = resolve("ts | 2018-08-15", &ctx).unwrap();
        // Midnight in UTC+8 is 16:00 the previous day in UTC.
        assert_eq!(resolved, DateResult::Instant(Literal::Integer(1_534_262_400)));
    }

    #[test]
    fn test_resolve_dates_as_text() {
        let resolved = resolve("dt | 2020", &ctx()).unwrap();
        assert_eq!(
            resolved,
            DateResult::Interval {
                start: Some(Literal::from("2020-01-01 00:00:00")),
                end: Some(Literal::from("2021-01-01 00:00:00")),
            }
        );
    }

    #[test]
    fn test_nonexistent_local_time() {
        // Clocks jump from 02:00 to 03:00 on 2021-03-14 in New York.
        let ctx = DateContext::new(at(2021, 3, 20, 0, 0, 0), chrono_tz::America::New_York);
        let err = resolve("ts | 2021-03-14 02:30:00", &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Timezone(_)));
    }

    #[test]
    fn test_syntax_errors() {
        for bad in [
            "dt | 20",
            "dt | 2020-13",
            "dt | 2020-02-30",
            "dt | next week",
            "dt | 3 fortnights ago",
            "dt | since",
            "dt | in last weeks",
            "xx | today",
            "dt | today tomorrow",
        ] {
            assert!(parse_expr(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_error_carries_input_and_position() {
        let err = parse_expr("dt | next week").unwrap_err();
        assert_eq!(err.input, "dt | next week");
        assert_eq!(err.position, 5);

        let err = parse_expr("dt | since").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    }
}
