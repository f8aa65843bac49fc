use ddda_core::SaveError;
use ddda_core::catalog::ItemCategory;
use ddda_core::flag::{Flag, TierFlag, TierTag};

#[test]
fn tier_roundtrips_over_the_full_table() {
    for tier in TierTag::ALL {
        for equipped in [false, true] {
            for purified in [false, true] {
                let flag = TierFlag {
                    tier,
                    equipped,
                    purified,
                };
                let decoded = TierFlag::decode(flag.encode())
                    .unwrap_or_else(|e| panic!("{tier:?} eq={equipped} pu={purified}: {e}"));
                assert_eq!(decoded, flag);
            }
        }
    }
}

#[test]
fn observed_game_values_decode() {
    let three = TierFlag::decode(3).expect("failed to decode 3");
    assert_eq!(three.tier, TierTag::NoStars);
    assert!(three.equipped);
    assert!(!three.purified);

    let thirteen = TierFlag::decode(13).expect("failed to decode 13");
    assert_eq!(thirteen.tier, TierTag::OneStar);
    assert!(!thirteen.equipped);

    let nineteen = TierFlag::decode(19).expect("failed to decode 19");
    assert_eq!(nineteen.tier, TierTag::TwoStars);
    assert!(nineteen.equipped);

    let purified_dragon = TierFlag::decode(67 | 0x80).expect("failed to decode 195");
    assert_eq!(purified_dragon.tier, TierTag::Dragonforged);
    assert!(purified_dragon.equipped);
    assert!(purified_dragon.purified);

    let gold = TierFlag::decode(1027).expect("failed to decode 1027");
    assert_eq!(gold.tier, TierTag::GoldForged);

    let silver = TierFlag::decode(515).expect("failed to decode 515");
    assert_eq!(silver.tier, TierTag::SilverForged);
}

#[test]
fn unknown_tier_id_is_rejected() {
    let err = TierFlag::decode(21).expect_err("bogus tier id accepted");
    assert!(
        matches!(err, SaveError::UnknownTier { raw: 21, .. }),
        "got {err:?}"
    );
}

#[test]
fn category_selects_the_variant() {
    assert!(matches!(
        Flag::decode(3, ItemCategory::Weapon),
        Ok(Flag::Tier(_))
    ));
    assert!(matches!(
        Flag::decode(19, ItemCategory::Armor),
        Ok(Flag::Tier(_))
    ));
    assert_eq!(
        Flag::decode(77, ItemCategory::Jewelry).expect("jewel decode failed"),
        Flag::Jewel(77)
    );
    assert_eq!(
        Flag::decode(9, ItemCategory::Other).expect("other decode failed"),
        Flag::Unknown(9)
    );
    // A tier-shaped garbage word on real equipment is an error, not a shrug.
    assert!(Flag::decode(21, ItemCategory::Weapon).is_err());
}

#[test]
fn jewel_passes_through_unchanged() {
    let flag = Flag::Jewel(0xDEAD);
    assert_eq!(flag.encode().expect("jewel encode failed"), 0xDEAD);
}

#[test]
fn unknown_flag_refuses_to_encode() {
    let err = Flag::Unknown(9).encode().expect_err("Unknown flag encoded");
    assert!(matches!(err, SaveError::InvalidOperation(_)), "got {err:?}");
}

#[test]
fn tags_follow_the_fixed_table() {
    let tags: Vec<&str> = TierTag::ALL.iter().map(|t| t.as_str()).collect();
    assert_eq!(
        tags,
        [
            "no stars",
            "1 star",
            "2 stars",
            "3 stars",
            "dragonforged",
            "silver forged",
            "gold forged"
        ]
    );
    assert_eq!(Flag::Jewel(12).tag(), "12");
    assert_eq!(Flag::Unknown(12).tag(), "UNKNOWN");
}
