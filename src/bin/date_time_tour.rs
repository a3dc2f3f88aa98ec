//! Dates, times, date-times and instants.
//!
//! Run with: cargo run --bin date_time_tour

use chrono::{Local, TimeDelta, Utc};
use colored::Colorize;
use lazy_pipeline::temporal::{self, zone};
use lazy_pipeline::{logging, TemporalError};
use std::error::Error;

fn report<T: std::fmt::Debug>(label: &str, result: Result<T, TemporalError>) {
    match result {
        Ok(value) => println!("{}: {:?}", label, value),
        Err(e) => println!("{}: {}", label, e.to_string().red()),
    }
}

fn local_date() -> Result<(), Box<dyn Error>> {
    println!("=== Dates ===\n");

    println!("Current Date = {}", Local::now().date_naive());
    println!("Specific Date = {}", temporal::date(2014, 1, 1)?);

    report("Feb 29 2014", temporal::date(2014, 2, 29));
    report("Feb 29 2016", temporal::date(2016, 2, 29));

    let kolkata = zone("Asia/Kolkata")?;
    println!("Current Date in Asia/Kolkata = {}", temporal::today_in(kolkata));
    report("zone(\"IST\")", zone("IST"));

    println!("365th day from base date = {}", temporal::date_from_epoch_day(365)?);
    println!("100th day of 2014 = {}", temporal::date_of_year_day(2014, 100)?);
    Ok(())
}

fn local_time() -> Result<(), Box<dyn Error>> {
    println!("\n=== Times ===\n");

    println!("Current Time = {}", Local::now().time());
    println!("Specific Time of Day = {}", temporal::time(12, 20, 25, 40)?);
    report("time(25, 20)", temporal::time(25, 20, 0, 0));

    let kolkata = zone("Asia/Kolkata")?;
    println!("Current Time in Asia/Kolkata = {}", temporal::now_in(kolkata).time());
    println!("10000th second time = {}", temporal::time_from_second_of_day(10_000)?);
    Ok(())
}

fn local_date_time() -> Result<(), Box<dyn Error>> {
    println!("\n=== Date-Times ===\n");

    println!("Current DateTime = {}", Local::now().naive_local());
    let today = Local::now().date_naive().and_time(Local::now().time());
    println!("Current DateTime from parts = {}", today);

    println!("Specific Date = {}", temporal::date_time(2014, 1, 1, 10, 10, 30)?);
    report("Feb 28 2014 25:01:01", temporal::date_time(2014, 2, 28, 25, 1, 1));

    let kolkata = zone("Asia/Kolkata")?;
    println!("Current DateTime in Asia/Kolkata = {}", temporal::now_in(kolkata));
    println!(
        "10000th second from 1970-01-01 = {}",
        temporal::date_time_from_epoch_second(10_000, 0)?
    );
    Ok(())
}

fn instant() -> Result<(), Box<dyn Error>> {
    println!("\n=== Instants ===\n");

    let timestamp = Utc::now();
    println!("Current Timestamp = {}", timestamp.to_rfc3339());

    let specific = temporal::from_epoch_millis(temporal::to_epoch_millis(timestamp))?;
    println!("Specific Time = {}", specific.to_rfc3339());

    let thirty_days = TimeDelta::try_days(30).ok_or("30 days is out of range")?;
    println!("Thirty days = {} ({} seconds)", thirty_days, thirty_days.num_seconds());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    local_date()?;
    local_time()?;
    local_date_time()?;
    instant()?;
    Ok(())
}
