use crate::error::{AppError, AppResult};

/// Validate a latitude/longitude pair. `label` names the point in the error.
pub fn validate_coordinates(label: &str, lat: f64, lng: f64) -> AppResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::InvalidArgument(format!(
            "{} latitude must be between -90 and 90",
            label
        )));
    }

    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::InvalidArgument(format!(
            "{} longitude must be between -180 and 180",
            label
        )));
    }

    Ok(())
}

/// Location descriptions are free text but may not be blank.
pub fn validate_location(label: &str, location: &str) -> AppResult<()> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(format!("{} location is required", label)));
    }
    if trimmed.chars().count() > 200 {
        return Err(AppError::InvalidArgument(format!(
            "{} location must be at most 200 characters",
            label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_manila_coordinates() {
        // NAIA Terminal 3
        assert!(validate_coordinates("Pickup", 14.5086, 121.0198).is_ok());
        // Antimeridian and poles are still on the map
        assert!(validate_coordinates("Dropoff", -90.0, 180.0).is_ok());
    }

    #[test]
    fn test_out_of_range() {
        let err = validate_coordinates("Pickup", 91.0, 0.0).unwrap_err();
        assert_eq!(err.to_string(), "Pickup latitude must be between -90 and 90");

        let err = validate_coordinates("Dropoff", 0.0, -180.5).unwrap_err();
        assert_eq!(err.to_string(), "Dropoff longitude must be between -180 and 180");

        assert!(validate_coordinates("Pickup", f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_blank_location() {
        assert!(validate_location("Pickup", "   ").is_err());
        assert!(validate_location("Pickup", "SM Mall of Asia").is_ok());
        assert!(validate_location("Pickup", &"x".repeat(201)).is_err());
    }
}
