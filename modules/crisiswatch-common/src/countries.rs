//! Compile-time registry of watched countries.
//!
//! Unknown countries are still assessable; adapters that need an ISO code
//! degrade to unavailable when a country isn't listed here.

/// Per-country configuration for the watchlist.
#[derive(Debug, Clone, Copy)]
pub struct CountryProfile {
    pub name: &'static str,
    pub iso3: &'static str,
    pub region: &'static str,
    pub population: u64,
    pub aliases: &'static [&'static str],
}

pub const WATCHLIST: &[CountryProfile] = &[
    CountryProfile {
        name: "Sudan",
        iso3: "SDN",
        region: "East Africa",
        population: 48_000_000,
        aliases: &["republic of the sudan"],
    },
    CountryProfile {
        name: "South Sudan",
        iso3: "SSD",
        region: "East Africa",
        population: 11_000_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Syria",
        iso3: "SYR",
        region: "Middle East",
        population: 23_000_000,
        aliases: &["syrian arab republic"],
    },
    CountryProfile {
        name: "Yemen",
        iso3: "YEM",
        region: "Middle East",
        population: 34_000_000,
        aliases: &["republic of yemen"],
    },
    CountryProfile {
        name: "Afghanistan",
        iso3: "AFG",
        region: "South Asia",
        population: 42_000_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Myanmar",
        iso3: "MMR",
        region: "Southeast Asia",
        population: 54_000_000,
        aliases: &["burma"],
    },
    CountryProfile {
        name: "Somalia",
        iso3: "SOM",
        region: "East Africa",
        population: 18_000_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Ethiopia",
        iso3: "ETH",
        region: "East Africa",
        population: 126_000_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Democratic Republic of the Congo",
        iso3: "COD",
        region: "Central Africa",
        population: 102_000_000,
        aliases: &["drc", "dr congo", "congo-kinshasa"],
    },
    CountryProfile {
        name: "Haiti",
        iso3: "HTI",
        region: "Caribbean",
        population: 11_700_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Ukraine",
        iso3: "UKR",
        region: "Eastern Europe",
        population: 37_000_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Venezuela",
        iso3: "VEN",
        region: "South America",
        population: 28_000_000,
        aliases: &["bolivarian republic of venezuela"],
    },
    CountryProfile {
        name: "Mali",
        iso3: "MLI",
        region: "West Africa",
        population: 23_000_000,
        aliases: &[],
    },
    CountryProfile {
        name: "Burkina Faso",
        iso3: "BFA",
        region: "West Africa",
        population: 23_000_000,
        aliases: &[],
    },
];

/// Loose lookup by display name or alias, case-insensitive.
pub fn country_by_name(name: &str) -> Option<&'static CountryProfile> {
    let needle = name.trim().to_lowercase();
    WATCHLIST.iter().find(|c| {
        c.name.to_lowercase() == needle
            || c.iso3.to_lowercase() == needle
            || c.aliases.iter().any(|a| *a == needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(country_by_name("sudan").unwrap().iso3, "SDN");
        assert_eq!(country_by_name("SUDAN").unwrap().iso3, "SDN");
    }

    #[test]
    fn lookup_accepts_aliases_and_iso3() {
        assert_eq!(country_by_name("DRC").unwrap().iso3, "COD");
        assert_eq!(country_by_name("burma").unwrap().name, "Myanmar");
        assert_eq!(country_by_name("yem").unwrap().name, "Yemen");
    }

    #[test]
    fn unknown_country_returns_none() {
        assert!(country_by_name("Atlantis").is_none());
    }

    #[test]
    fn watchlist_has_no_duplicate_iso3() {
        let mut codes: Vec<_> = WATCHLIST.iter().map(|c| c.iso3).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), WATCHLIST.len());
    }
}
