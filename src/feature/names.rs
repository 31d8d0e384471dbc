//! Model file naming inside geospecific archives and the model ledgers.

/// Ledger key, `FACC_FSC_MODL.flt`.
pub fn model_key(facc: &str, fsc: &str, model: &str) -> String {
    format!("{facc}_{fsc}_{model}.flt")
}

/// Archive member name: the set's header followed by the model key.
pub fn archive_model_name(header: &str, facc: &str, fsc: &str, model: &str) -> String {
    format!("{header}{}", model_key(facc, fsc, model))
}

/// First archive member containing `name`. Members may carry a directory prefix.
pub fn find_in_archive<'a>(listing: &'a [String], name: &str) -> Option<&'a String> {
    listing.iter().find(|member| member.contains(name))
}

/// Recover the ledger key from an archive member. The header is matched up to
/// its dataset selector (`_S`) so members of sibling selectors still resolve.
pub fn key_from_archive_name(member: &str, header: &str) -> Option<String> {
    let prefix_end = header.find("_S")? + 2;
    let pos = member.find(&header[..prefix_end])?;
    member
        .get(pos + header.len()..)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "N00E000_D300_S001_T001_L02_U1_R3_";

    #[test]
    fn names() {
        assert_eq!(model_key("AL015", "000", "house"), "AL015_000_house.flt");
        assert_eq!(
            archive_model_name(HEADER, "AL015", "000", "house"),
            "N00E000_D300_S001_T001_L02_U1_R3_AL015_000_house.flt"
        );
    }

    #[test]
    fn archive_lookup_by_substring() {
        let listing = vec![
            "geometry/N00E000_D300_S001_T001_L02_U1_R3_AL015_000_barn.flt".to_string(),
            "geometry/N00E000_D300_S001_T001_L02_U1_R3_AL015_000_house.flt".to_string(),
        ];
        let found = find_in_archive(&listing, "N00E000_D300_S001_T001_L02_U1_R3_AL015_000_house.flt");
        assert_eq!(found, Some(&listing[1]));
        assert!(find_in_archive(&listing, "tower.flt").is_none());
    }

    #[test]
    fn key_recovered_from_member() {
        let member = "geometry/N00E000_D300_S001_T001_L02_U1_R3_AL015_000_house.flt";
        assert_eq!(key_from_archive_name(member, HEADER).as_deref(), Some("AL015_000_house.flt"));
        assert_eq!(key_from_archive_name("readme.txt", HEADER), None);
        assert_eq!(key_from_archive_name("N00E000_D300_S001_T001_L02_U1_R3_", HEADER), None);
    }
}
