//! A small built-in lineup used by `dynasty seed-demo` and by tests.

use crate::catalog::{Dataset, Model, Series, Tech};

type ModelRow = (i64, &'static str, i64, f64, f64, &'static str, &'static str, u32, &'static str);

const MODELS: [ModelRow; 12] = [
    (9001, "汉EV", 1, 20.98, 605.0, "EV", "轿车", 5, "2020"),
    (9002, "汉DM-i", 1, 18.98, 121.0, "PHEV", "轿车", 5, "2022"),
    (9003, "唐DM-i", 1, 17.98, 112.0, "PHEV", "SUV", 7, "2021"),
    (9004, "宋PLUS DM-i", 1, 15.48, 110.0, "PHEV", "SUV", 5, "2021"),
    (9005, "秦PLUS DM-i", 1, 7.98, 55.0, "PHEV", "轿车", 5, "2021"),
    (9006, "海豹", 2, 17.98, 650.0, "EV", "轿车", 5, "2022"),
    (9007, "海豚", 2, 9.98, 420.0, "EV", "两厢车", 5, "2021"),
    (9008, "海鸥", 2, 6.98, 405.0, "EV", "两厢车", 4, "2023"),
    (9009, "腾势D9", 3, 33.98, 190.0, "PHEV", "MPV", 7, "2022"),
    (9010, "仰望U8", 4, 109.8, 180.0, "PHEV", "SUV", 5, "2023"),
    (9011, "仰望U9", 4, 168.0, 465.0, "EV", "跑车", 2, "2024"),
    (9012, "豹5", 5, 28.98, 125.0, "PHEV", "SUV", 5, "2023"),
];

/// Five series, six technologies and a dozen models with their associations.
pub fn demo_dataset() -> Dataset {
    let series = vec![
        Series::new(1, "王朝", "以中国朝代命名的家族化车型"),
        Series::new(2, "海洋", "以海洋生物命名的年轻化车型"),
        Series::new(3, "腾势", "高端新能源品牌"),
        Series::new(4, "仰望", "百万级豪华新能源品牌"),
        Series::new(5, "方程豹", "个性化专业越野品牌"),
    ];
    let techs = vec![
        Tech::new(100, "DM-i超级混动", "以电为主的插电混动架构"),
        Tech::new(101, "e平台3.0", "纯电专属平台，八合一电驱"),
        Tech::new(102, "刀片电池", "磷酸铁锂电池，针刺不起火"),
        Tech::new(103, "云辇系统", "智能车身控制系统"),
        Tech::new(104, "DiPilot", "智能驾驶辅助系统"),
        Tech::new(105, "易四方", "四电机独立驱动平台"),
    ];
    let models = MODELS
        .iter()
        .map(
            |&(id, name, series_id, price, range_km, energy_type, body_type, seats, launch_year)| {
                Model {
                    range_km,
                    body_type: body_type.to_string(),
                    seats,
                    launch_year: launch_year.to_string(),
                    ..Model::new(id, name, series_id, price, energy_type)
                }
            },
        )
        .collect();
    let associations = vec![
        (9001, 101),
        (9001, 102),
        (9001, 104),
        (9002, 100),
        (9002, 102),
        (9003, 100),
        (9003, 102),
        (9004, 100),
        (9004, 102),
        (9005, 100),
        (9005, 102),
        (9006, 101),
        (9006, 102),
        (9006, 104),
        (9007, 101),
        (9007, 102),
        (9008, 101),
        (9008, 102),
        (9009, 100),
        (9009, 102),
        (9009, 104),
        (9010, 102),
        (9010, 103),
        (9010, 105),
        (9011, 102),
        (9011, 103),
        (9011, 105),
        (9012, 100),
        (9012, 102),
        (9012, 103),
    ];
    Dataset {
        series,
        techs,
        models,
        associations,
    }
}
