//! Date arithmetic, adjusters, periods, formatting and legacy conversions.
//!
//! Run with: cargo run --bin date_time_utilities

use chrono::{Datelike, Local, Utc};
use lazy_pipeline::logging;
use lazy_pipeline::temporal::{self, Unit, BASIC_ISO_DATE};
use std::error::Error;
use std::time::SystemTime;

fn temporal_adjusters() -> Result<(), Box<dyn Error>> {
    println!("=== Arithmetic and Adjusters ===\n");

    let today = Local::now().date_naive();
    println!(
        "Year {} is leap year? {}",
        today.year(),
        temporal::is_leap_year(today.year())
    );
    println!("Today is before 2015-01-01? {}", today < temporal::date(2015, 1, 1)?);
    println!("Current Time = {}", today.and_time(Local::now().time()));

    println!("10 days after today will be {}", temporal::plus(today, 10, Unit::Days)?);
    println!("3 weeks after today will be {}", temporal::plus(today, 3, Unit::Weeks)?);
    println!("20 months after today will be {}", temporal::plus(today, 20, Unit::Months)?);
    println!("10 days before today will be {}", temporal::minus(today, 10, Unit::Days)?);
    println!("3 weeks before today will be {}", temporal::minus(today, 3, Unit::Weeks)?);
    println!("20 months before today will be {}", temporal::minus(today, 20, Unit::Months)?);

    println!("First date of this month = {}", temporal::first_day_of_month(today));
    let last_day_of_year = temporal::last_day_of_year(today);
    println!("Last date of this year = {}", last_day_of_year);

    let period = temporal::period_between(today, last_day_of_year);
    println!("Period format = {}", period);
    println!("Months remaining in the year = {}", period.months);
    Ok(())
}

fn formatting() -> Result<(), Box<dyn Error>> {
    println!("\n=== Formatting and Parsing ===\n");

    let date = Local::now().date_naive();
    println!("Default format of date = {}", date);
    println!("{}", temporal::format_date(&date, "%-d::%b::%Y")?);
    println!("{}", temporal::format_date(&date, BASIC_ISO_DATE)?);

    let date_time = Local::now().naive_local();
    println!("Default format of date-time = {}", date_time);
    println!("{}", temporal::format_date_time(&date_time, "%-d::%b::%Y %H::%M::%S")?);
    println!("{}", temporal::format_date_time(&date_time, BASIC_ISO_DATE)?);

    println!("Default format of instant = {}", Utc::now().to_rfc3339());

    let parsed = temporal::parse_date_time("27::Apr::2014 21::39::48", "%d::%b::%Y %H::%M::%S")?;
    println!("Default format after parsing = {}", parsed);

    if let Err(e) = temporal::parse_date_time("27-Apr-2014", "%d::%b::%Y %H::%M::%S") {
        println!("Mismatched text: {}", e);
    }
    Ok(())
}

fn legacy_conversions() -> Result<(), Box<dyn Error>> {
    println!("\n=== Legacy Conversions ===\n");

    let timestamp = temporal::from_system_time(SystemTime::now());
    let pst = temporal::zone_from_short_id("PST")?;
    println!("Date in PST = {}", temporal::local_date_time(timestamp, pst));

    let millis = temporal::to_epoch_millis(timestamp);
    println!("Epoch millis = {}", millis);
    println!("Back from millis = {}", temporal::from_epoch_millis(millis)?);

    match temporal::zoned(Local::now().naive_local(), pst) {
        Ok(zoned) => println!("Zoned date-time = {}", zoned),
        Err(e) => println!("Local time has no PST equivalent: {}", e),
    }

    let system = temporal::to_system_time(Utc::now());
    println!("As SystemTime = {:?}", system);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    temporal_adjusters()?;
    formatting()?;
    legacy_conversions()?;
    Ok(())
}
