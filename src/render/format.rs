use chrono::{Utc, DateTime};

pub fn format_date_time(datetime: &DateTime<Utc>) -> String {
    let d = Utc::now().signed_duration_since(*datetime);
    if d.num_days() > 365 {
        datetime.format("%b %d %Y").to_string()
    } else if d.num_days() > 0 {
        datetime.format("%b %d").to_string()
    } else if d.num_hours() > 0 {
        format!("{}h ago", d.num_hours())
    } else {
        format!("{}m ago", d.num_minutes().max(0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn recent_times_are_relative() {
        assert_eq!(format_date_time(&(Utc::now() - Duration::minutes(5))), "5m ago");
        assert_eq!(format_date_time(&(Utc::now() - Duration::hours(3))), "3h ago");
    }

    #[test]
    fn old_times_include_the_year() {
        let datetime = "2001-02-03T04:05:06Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(format_date_time(&datetime), "Feb 03 2001");
    }
}
