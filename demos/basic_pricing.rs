//! Example: Pricing one contract three ways
//!
//! Run with: cargo run --example basic_pricing

use options_pricing_engine::prelude::*;

fn main() -> PricingResult<()> {
    // Option parameters
    let spot = 100.0;
    let strike = 100.0;
    let time = 1.0;
    let rate = 0.05; // 5% risk-free rate
    let vol = 0.20; // 20% volatility

    let call = OptionContract::european(spot, strike, rate, vol, time, OptionType::Call)?;
    let put = call.with_option_type(OptionType::Put);

    println!("=== Black-Scholes Pricing ===\n");
    println!("Spot:     ${:.2}", spot);
    println!("Strike:   ${:.2}", strike);
    println!("Time:     {:.2} years", time);
    println!("Rate:     {:.1}%", rate * 100.0);
    println!("Vol:      {:.1}%\n", vol * 100.0);

    let call_price = bs_price(&call)?;
    let put_price = bs_price(&put)?;
    println!("Call Price: ${:.4}", call_price);
    println!("Put Price:  ${:.4}", put_price);

    // Put-call parity: C - P = S - K*e^(-rT)
    let parity_lhs = call_price - put_price;
    let parity_rhs = spot - strike * call.discount_factor();
    println!("\nPut-Call Parity Check:");
    println!("  C - P = {:.4}", parity_lhs);
    println!("  S - K*e^(-rT) = {:.4}", parity_rhs);
    println!("  Difference: {:.2e}", (parity_lhs - parity_rhs).abs());

    println!("\n=== Greeks (Call) ===\n");
    let greeks = bs_greeks(&call)?;
    println!("Delta:  {:.4}", greeks.delta);
    println!("Gamma:  {:.4}", greeks.gamma);
    println!("Theta:  {:.4} (per day: {:.4})", greeks.theta, greeks.theta_per_day());
    println!("Vega:   {:.4}", greeks.vega);
    println!("Rho:    {:.4}", greeks.rho);

    println!("\n=== Binomial Lattice ===\n");
    for steps in [50, 200, 1000] {
        println!("European call, {:>4} steps: {:.4}", steps, price_binomial(&call, steps)?);
    }
    let american_put = put.with_exercise_style(ExerciseStyle::American);
    let am = price_binomial(&american_put, 200)?;
    println!("American put,   200 steps: {:.4} (early exercise premium {:.4})", am, am - put_price);

    println!("\n=== Monte Carlo ===\n");
    let plain = price_monte_carlo(&call, 100_000, false, Some(42))?;
    let anti = price_monte_carlo(&call, 100_000, true, Some(42))?;
    println!("Plain:      {:.4} ± {:.4}", plain.price, plain.std_error);
    println!("Antithetic: {:.4} ± {:.4}", anti.price, anti.std_error);
    let (lo, hi) = anti.confidence_interval(1.96);
    println!("95% interval: [{:.4}, {:.4}]", lo, hi);

    println!("\n=== Implied Volatility ===\n");
    let market_price = call_price + 0.50; // Simulated market quote
    match implied_volatility(&call, market_price) {
        Ok(iv) => println!(
            "Market price ${:.4} implies vol: {:.2}%",
            market_price,
            iv * 100.0
        ),
        Err(e) => println!("Could not solve for IV: {}", e),
    }

    Ok(())
}
