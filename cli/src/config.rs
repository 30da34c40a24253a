use std::collections::HashMap;

pub const BFLIST_BASE: &str = "https://api.bflist.io/v2/bf4/";
pub const GAMETOOLS_BASE: &str = "https://api.gametools.network/bf4/";

pub const USER_AGENT: &str = "BF4 Player Database Generator 1.0";

// Base attributes copied verbatim from the stats payload, in column order
pub const PLAYER_BASE_STATS: [&str; 24] = [
    "userName",
    "id",
    "rank",
    "scorePerMinute",
    "killsPerMinute",
    "killDeath",
    "quits",
    "accuracy",
    "headshots",
    "kills",
    "deaths",
    "wins",
    "loses",
    "avengerKills",
    "saviorKills",
    "headShots",
    "heals",
    "revives",
    "repairs",
    "resupplies",
    "killAssists",
    "skill",
    "longestHeadShot",
    "highestKillStreak",
];

pub const WEAPON_TYPES: [&str; 13] = [
    "LMGs",
    "Shotguns",
    "Gadgets Explosives",
    "Hand Grenades",
    "Carbines",
    "Rocket Launchers",
    "PDWs",
    "DMRs",
    "Handguns",
    "Assault Rifles",
    "Underslung Launchers",
    "Sniper Rifles",
    "Special",
];

pub const VEHICLE_TYPES: [&str; 13] = [
    "Infantry Fighting Vehicle",
    "Stationary",
    "Soldier Equipment",
    "Air Helicopter Scout",
    "Transport",
    "Anti Air",
    "Mobile Artillery",
    "Main Battle Tanks",
    "Air Helicopter Attack",
    "Air",
    "Air Jet Stealth",
    "Air Jet Attack",
    "Fast Attack Craft",
];

// The stats API reports some vehicles under their model name or a misspelled
// class; raw label -> canonical vehicle category
pub fn vehicle_remap() -> HashMap<&'static str, &'static str> {
    let mut mapping = HashMap::new();

    mapping.insert("IFV LAV-25", "Infantry Fighting Vehicle");
    mapping.insert("IFV BTR 90", "Infantry Fighting Vehicle");
    mapping.insert("Stationary ", "Stationary"); // trailing space
    mapping.insert("Stationary AA", "Anti Air");
    mapping.insert("Soldier Equiment", "Soldier Equipment");
    mapping.insert("Air Helicopter Scout AH6", "Air Helicopter Scout");
    mapping.insert("Air Helicopter Scout z11", "Air Helicopter Scout");
    mapping.insert("Transport KA-60", "Transport");
    mapping.insert("Transport UH-1Y Venom", "Transport");
    mapping.insert("Jeep SPM3", "Transport");
    mapping.insert("Boat", "Transport");
    mapping.insert("AA 9K22 Tunguska", "Anti Air");
    mapping.insert("AA LAV-AD", "Anti Air");
    mapping.insert("HIMARS", "Mobile Artillery");
    mapping.insert("MBT T90", "Main Battle Tanks");
    mapping.insert("MBT M1 Abrams", "Main Battle Tanks");

    mapping
}
