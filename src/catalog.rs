//! Built-in station catalog and name lookup.
//!
//! The CLI resolves user-supplied names against this table; the engine itself
//! only ever sees resolved `Station` values.

use crate::station::Station;

/// All stations bundled with the binary, Beijing first, then Shanghai.
pub fn builtin_stations() -> Vec<Station> {
    let mut stations = beijing_stations();
    stations.extend(shanghai_stations());
    stations
}

/// Look a station up by primary or alternate name, case-insensitively.
pub fn find(name: &str) -> Option<Station> {
    let wanted = name.trim().to_lowercase();
    builtin_stations().into_iter().find(|station| {
        station.name.to_lowercase() == wanted || station.name_alt.to_lowercase() == wanted
    })
}

fn station(id: &str, name: &str, name_alt: &str, line: &str, city: &str) -> Station {
    Station::new(id, name, name_alt, line, city)
}

fn beijing_stations() -> Vec<Station> {
    vec![
        // 1号线
        station("bj-sihui", "四惠", "Sihui", "1号线", "北京"),
        station("bj-dawanglu", "大望路", "Dawanglu", "1号线", "北京"),
        station("bj-guomao", "国贸", "Guomao", "1号线", "北京"),
        station("bj-wangfujing", "王府井", "Wangfujing", "1号线", "北京"),
        station("bj-tiananmendong", "天安门东", "Tian'anmen Dong", "1号线", "北京"),
        station("bj-xidan", "西单", "Xidan", "1号线", "北京"),
        station("bj-fuxingmen", "复兴门", "Fuxingmen", "1号线", "北京"),
        station("bj-gongzhufen", "公主坟", "Gongzhufen", "1号线", "北京"),
        station("bj-wukesong", "五棵松", "Wukesong", "1号线", "北京"),
        // 2号线
        station("bj-beijingzhan", "北京站", "Beijing Railway Station", "2号线", "北京"),
        station("bj-qianmen", "前门", "Qianmen", "2号线", "北京"),
        station("bj-xuanwumen", "宣武门", "Xuanwumen", "2号线", "北京"),
        station("bj-xizhimen", "西直门", "Xizhimen", "2号线", "北京"),
        station("bj-guloudajie", "鼓楼大街", "Gulou Dajie", "2号线", "北京"),
        station("bj-yonghegong", "雍和宫", "Yonghegong Lama Temple", "2号线", "北京"),
        // 10号线
        station("bj-sanyuanqiao", "三元桥", "Sanyuanqiao", "10号线", "北京"),
        station("bj-liangmaqiao", "亮马桥", "Liangmaqiao", "10号线", "北京"),
        station("bj-tuanjiehu", "团结湖", "Tuanjiehu", "10号线", "北京"),
        station("bj-hujialou", "呼家楼", "Hujialou", "10号线", "北京"),
        station("bj-shuangjing", "双井", "Shuangjing", "10号线", "北京"),
        // 4号线
        station("bj-beijingnanzhan", "北京南站", "Beijing South Railway Station", "4号线", "北京"),
        station("bj-zhongguancun", "中关村", "Zhongguancun", "4号线", "北京"),
        station("bj-yuanmingyuan", "圆明园", "Old Summer Palace", "4号线", "北京"),
    ]
}

fn shanghai_stations() -> Vec<Station> {
    vec![
        // 1号线
        station("sh-xinzhuang", "莘庄", "Xinzhuang", "1号线", "上海"),
        station("sh-xujiahui", "徐家汇", "Xujiahui", "1号线", "上海"),
        station("sh-changshulu", "常熟路", "Changshu Road", "1号线", "上海"),
        station("sh-shanxinanlu", "陕西南路", "South Shaanxi Road", "1号线", "上海"),
        station("sh-renminguangchang", "人民广场", "People's Square", "1号线", "上海"),
        station("sh-shanghaihuochezhan", "上海火车站", "Shanghai Railway Station", "1号线", "上海"),
        // 2号线
        station("sh-jingansi", "静安寺", "Jing'an Temple", "2号线", "上海"),
        station("sh-nanjingxilu", "南京西路", "West Nanjing Road", "2号线", "上海"),
        station("sh-nanjingdonglu", "南京东路", "East Nanjing Road", "2号线", "上海"),
        station("sh-lujiazui", "陆家嘴", "Lujiazui", "2号线", "上海"),
        station("sh-shijidadao", "世纪大道", "Century Avenue", "2号线", "上海"),
        station("sh-longyanglu", "龙阳路", "Longyang Road", "2号线", "上海"),
        station("sh-pudongjichang", "浦东国际机场", "Pudong International Airport", "2号线", "上海"),
        station("sh-hongqiaohuochezhan", "虹桥火车站", "Hongqiao Railway Station", "2号线", "上海"),
        // 10号线
        station("sh-xintiandi", "新天地", "Xintiandi", "10号线", "上海"),
        station("sh-yuyuan", "豫园", "Yu Garden", "10号线", "上海"),
        station("sh-jiaotongdaxue", "交通大学", "Jiaotong University", "10号线", "上海"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let stations = builtin_stations();
        let mut ids: Vec<_> = stations.iter().map(|s| s.id.0.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), stations.len());
    }

    #[test]
    fn finds_by_primary_name() {
        let station = find("国贸").expect("国贸 should be in the catalog");
        assert_eq!(station.id.0, "bj-guomao");
    }

    #[test]
    fn finds_by_alternate_name_case_insensitively() {
        let station = find("guomao").expect("Guomao should be in the catalog");
        assert_eq!(station.id.0, "bj-guomao");
    }

    #[test]
    fn unknown_name_returns_none() {
        assert!(find("Atlantis").is_none());
    }
}
