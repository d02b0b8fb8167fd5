//! Everyday financial formulas.
//!
//! These are plain Rust functions. Their doc blocks are read by the source
//! analyzer, so the tags below are the formula metadata.

/// Future value of a principal under periodic compounding.
///
/// @id compound_interest
/// @name Compound Interest
/// @tags ["finance", "interest"]
/// @engineHint.default.rounding round
/// @engineHint.default.scale 2
/// @param principal Amount invested @unit USD
/// @param rate Annual nominal rate as a fraction @unit 1/yr @default 0.05
/// @param years Investment horizon @unit yr
/// @param periods_per_year Compounding periods per year @default 12
/// @returns Future value
pub fn compound_interest(principal: f64, rate: f64, years: f64, periods_per_year: u32) -> f64 {
    let n = f64::from(periods_per_year.max(1));
    principal * (1.0 + rate / n).powf(n * years)
}

/// Fixed monthly payment that amortizes a loan.
///
/// @id loan_payment
/// @name Loan Payment
/// @tags ["finance", "lending"]
/// @engineHint.default.rounding ceil
/// @engineHint.default.scale 2
/// @param principal Amount borrowed @unit USD
/// @param annual_rate Annual nominal rate as a fraction @unit 1/yr
/// @param months Number of monthly payments
/// @returns Monthly payment
pub fn loan_payment(principal: f64, annual_rate: f64, months: u32) -> f64 {
    let n = f64::from(months.max(1));
    let r = annual_rate / 12.0;
    if r == 0.0 {
        return principal / n;
    }
    principal * r / (1.0 - (1.0 + r).powf(-n))
}

/// Net present value of a series of cash flows.
///
/// The first cash flow happens now and is not discounted.
///
/// @id net_present_value
/// @name Net Present Value
/// @tags ["finance", "valuation"]
/// @engineHint.default.rounding round
/// @engineHint.default.scale 2
/// @param rate Discount rate per period @default 0.1
/// @param cash_flows Cash flow of each period, starting at t=0 @unit USD
/// @returns Present value of all cash flows
pub fn net_present_value(rate: f64, cash_flows: &[f64]) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Relative change between two values, in percent.
///
/// @id percent_change
/// @name Percent Change
/// @tags ["math"]
/// @engineHint.default.rounding round
/// @engineHint.default.scale 4
/// @param from Reference value
/// @param to New value
/// @returns Change in percent, or null when the reference is zero
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    (from != 0.0).then(|| (to - from) / from.abs() * 100.0)
}
