//! Custom askama filters available to the templates.

pub fn money(value: &f64) -> askama::Result<String> {
    Ok(format!("R$ {value:.2}"))
}

pub fn percent(value: &f64) -> askama::Result<String> {
    Ok(format!("{value:.0}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_renders_two_decimals() {
        assert_eq!(money(&75.0).unwrap(), "R$ 75.00");
        assert_eq!(money(&35.5).unwrap(), "R$ 35.50");
    }

    #[test]
    fn percent_renders_whole_numbers() {
        assert_eq!(percent(&40.0).unwrap(), "40%");
    }
}
