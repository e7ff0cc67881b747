use super::ui;
use crate::core::currency::{Currency, ExchangeRate};
use crate::rates::ExchangeRateService;
use anyhow::Result;
use comfy_table::Cell;

/// Renders rates as a table of "1 unit of target = rate units of base".
pub fn display_as_table(rates: &[ExchangeRate]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);

    for rate in rates {
        table.add_row(vec![
            Cell::new(rate.target().code()),
            ui::number_cell(format!("{} {}", rate.rate(), rate.base())),
        ]);
    }

    let mut output = match rates.first() {
        Some(rate) => format!(
            "Exchange rates in {}\n\n",
            ui::style_text(rate.base().code(), ui::StyleType::Title)
        ),
        None => String::new(),
    };
    output.push_str(&table.to_string());
    output
}

pub async fn show_rates(
    service: &ExchangeRateService,
    currencies: &[Currency],
    json: bool,
) -> Result<()> {
    let rates = service.get_exchange_rates(currencies).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rates)?);
        return Ok(());
    }

    if rates.is_empty() {
        eprintln!(
            "{} {}",
            ui::style_text("No rates available.", ui::StyleType::Error),
            ui::style_text("Run with --verbose for details.", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    println!("{}", display_as_table(&rates));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display_as_table() {
        let czk = Currency::new("CZK");
        let rates = vec![
            ExchangeRate::new(czk.clone(), Currency::new("JPY"), dec!(0.1496)).unwrap(),
            ExchangeRate::new(czk, Currency::new("USD"), dec!(22.222)).unwrap(),
        ];

        let output = display_as_table(&rates);
        assert!(output.contains("Exchange rates in"));
        assert!(output.contains("JPY"));
        assert!(output.contains("0.1496 CZK"));
        assert!(output.contains("USD"));
        assert!(output.contains("22.222 CZK"));
    }
}
