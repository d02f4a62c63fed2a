use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::TeslaModel;

/// One node of a category hierarchy, named before the model's naming
/// convention is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<CategoryDefinition>,
}

impl CategoryDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            children: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_children(mut self, children: Vec<CategoryDefinition>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Depth of this subtree; a leaf is 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }
}

/// A caller-supplied category forest, replacing the built-in hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HierarchyDefinition {
    pub roots: Vec<CategoryDefinition>,
}

impl HierarchyDefinition {
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(CategoryDefinition::node_count).sum()
    }
}

impl From<CategoryDefinition> for HierarchyDefinition {
    fn from(root: CategoryDefinition) -> Self {
        Self { roots: vec![root] }
    }
}

struct GroupTemplate {
    code: &'static str,
    label: &'static str,
    subgroups: &'static [&'static str],
}

impl GroupTemplate {
    fn name(&self) -> String {
        format!("{} - {}", self.code, self.label)
    }
}

/// Main groups shared by the Model 3 and Model Y parts catalogs.
/// Subgroup names already carry their four-digit code.
const TESLA_GROUPS: &[GroupTemplate] = &[
    GroupTemplate {
        code: "10",
        label: "BODY",
        subgroups: &[
            "1001 - Bumper and Fascia",
            "1002 - Fenders and Quarter Panels",
            "1003 - Hood and Frunk",
            "1004 - Liftgate and Trunk Lid",
            "1005 - Underbody Shields",
            "1006 - Body Structure",
        ],
    },
    GroupTemplate {
        code: "11",
        label: "CLOSURES",
        subgroups: &[
            "1101 - Front Doors",
            "1102 - Rear Doors",
            "1103 - Door Handles",
            "1104 - Door Seals and Weatherstrips",
            "1105 - Latches and Strikers",
        ],
    },
    GroupTemplate {
        code: "12",
        label: "EXTERIOR",
        subgroups: &[
            "1201 - Mirrors",
            "1202 - Exterior Trim and Badges",
            "1203 - Wipers and Washers",
            "1204 - Mud Flaps and Splash Guards",
            "1205 - Glass and Windshield",
        ],
    },
    GroupTemplate {
        code: "13",
        label: "INTERIOR",
        subgroups: &[
            "1301 - Interior Trim Panels",
            "1302 - Headliner",
            "1303 - Carpets",
            "1304 - Center Console",
            "1305 - Storage and Cup Holders",
        ],
    },
    GroupTemplate {
        code: "14",
        label: "INSTRUMENT PANEL",
        subgroups: &[
            "1401 - Dashboard",
            "1402 - Touchscreen Display",
            "1403 - Glove Box",
            "1404 - Air Vents",
        ],
    },
    GroupTemplate {
        code: "15",
        label: "SEATS",
        subgroups: &[
            "1501 - Front Seats",
            "1502 - Rear Seats",
            "1503 - Seat Covers and Trim",
            "1504 - Seat Heaters and Motors",
        ],
    },
    GroupTemplate {
        code: "16",
        label: "SAFETY AND RESTRAINTS",
        subgroups: &["1601 - Airbags", "1602 - Seat Belts", "1603 - Crash Sensors"],
    },
    GroupTemplate {
        code: "17",
        label: "ELECTRICAL",
        subgroups: &[
            "1701 - Low Voltage Battery",
            "1702 - Wiring Harnesses",
            "1703 - Fuses and Relays",
            "1704 - Switches and Controls",
            "1705 - Control Modules",
        ],
    },
    GroupTemplate {
        code: "18",
        label: "LIGHTING",
        subgroups: &[
            "1801 - Headlights",
            "1802 - Tail Lights",
            "1803 - Fog and Side Lights",
            "1804 - Interior Lighting",
        ],
    },
    GroupTemplate {
        code: "19",
        label: "INFOTAINMENT",
        subgroups: &[
            "1901 - Audio and Speakers",
            "1902 - Antennas",
            "1903 - Cameras",
            "1904 - USB and Connectivity",
        ],
    },
    GroupTemplate {
        code: "20",
        label: "THERMAL MANAGEMENT",
        subgroups: &[
            "2001 - Radiators and Heat Exchangers",
            "2002 - Coolant Pumps and Valves",
            "2003 - Coolant Hoses",
            "2004 - Heat Pump",
        ],
    },
    GroupTemplate {
        code: "21",
        label: "HVAC",
        subgroups: &[
            "2101 - AC Compressor",
            "2102 - Cabin Air Filters",
            "2103 - Blower and Ducts",
            "2104 - Climate Controls",
        ],
    },
    GroupTemplate {
        code: "22",
        label: "HIGH VOLTAGE",
        subgroups: &[
            "2201 - HV Battery Pack",
            "2202 - HV Cables",
            "2203 - Pyro Fuse and Contactors",
            "2204 - DC-DC Converter",
        ],
    },
    GroupTemplate {
        code: "23",
        label: "CHARGING",
        subgroups: &[
            "2301 - Charge Port",
            "2302 - Onboard Charger",
            "2303 - Mobile Connector and Adapters",
        ],
    },
    GroupTemplate {
        code: "30",
        label: "CHASSIS",
        subgroups: &[
            "3001 - Subframes",
            "3002 - Crossmembers and Brackets",
            "3003 - Jacking Points",
        ],
    },
    GroupTemplate {
        code: "31",
        label: "SUSPENSION",
        subgroups: &[
            "3101 - Front Suspension",
            "3102 - Rear Suspension",
            "3103 - Shocks and Struts",
            "3104 - Control Arms and Links",
            "3105 - Ride Height Sensors",
        ],
    },
    GroupTemplate {
        code: "32",
        label: "STEERING",
        subgroups: &[
            "3201 - Steering Rack",
            "3202 - Steering Wheel",
            "3203 - Steering Column",
            "3204 - Tie Rods",
        ],
    },
    GroupTemplate {
        code: "33",
        label: "BRAKES",
        subgroups: &[
            "3301 - Brake Pads",
            "3302 - Brake Rotors",
            "3303 - Calipers",
            "3304 - Parking Brake",
            "3305 - Brake Lines and Fluid",
        ],
    },
    GroupTemplate {
        code: "34",
        label: "WHEELS AND TIRES",
        subgroups: &[
            "3401 - Wheels",
            "3402 - Tires",
            "3403 - Wheel Covers and Caps",
            "3404 - TPMS Sensors",
            "3405 - Lug Nuts",
        ],
    },
    GroupTemplate {
        code: "39",
        label: "DRIVE UNIT",
        subgroups: &[
            "3901 - Front Drive Unit",
            "3902 - Rear Drive Unit",
            "3903 - Half Shafts",
            "3904 - Drive Unit Mounts",
        ],
    },
    GroupTemplate {
        code: "40",
        label: "ACCESSORIES",
        subgroups: &[
            "4001 - Floor Mats",
            "4002 - Roof Racks",
            "4003 - Tow Hitch",
            "4004 - Screen Protectors",
            "4005 - Key Cards and Fobs",
        ],
    },
];

/// Built-in hierarchy for a model, names not yet passed through the
/// model's naming convention. Only Model 3 and Model Y have one.
pub fn builtin_hierarchy(model: TeslaModel) -> Option<CategoryDefinition> {
    if !matches!(model, TeslaModel::Model3 | TeslaModel::ModelY) {
        return None;
    }
    let display = model.display_name();

    let groups = TESLA_GROUPS
        .iter()
        .map(|group| {
            let subgroups = group
                .subgroups
                .iter()
                .map(|name| CategoryDefinition::new(*name))
                .collect();
            CategoryDefinition::new(group.name())
                .with_description(format!("{display} {} parts", group.label.to_lowercase()))
                .with_children(subgroups)
        })
        .collect();

    Some(
        CategoryDefinition::new(display)
            .with_description(format!("Replacement and upgrade parts for the Tesla {display}"))
            .with_children(groups),
    )
}

/// Coded main-group name for a bare label, e.g. `"body"` → `"10 - BODY"`.
pub fn coded_group_name(label: &str) -> Option<String> {
    let label = label.trim();
    TESLA_GROUPS
        .iter()
        .find(|group| group.label.eq_ignore_ascii_case(label))
        .map(GroupTemplate::name)
}
