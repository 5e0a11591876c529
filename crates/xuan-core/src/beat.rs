//! 节拍与对齐词汇表.
//!
//! 节拍图 (rhythm map) 的每个字符对应一种视觉切换效果.
//! 字符映射是封闭枚举上的纯函数, 未识别的符号一律视为无切换, 不报错.

/// 节拍对应的视觉切换类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// 纵向模糊 (`x`)
    VerticalBlur,
    /// 横向模糊 (`o`)
    HorizontalBlur,
    /// 直切, 无模糊 (`-`)
    NoBlur,
    /// 黑场 (`+`)
    Blackout,
    /// 短黑场 (`|`)
    ShortBlackout,
    /// 仅换色 (`:`)
    ColorOnly,
    /// 仅换图 (`*`)
    ImageOnly,
    /// 无切换 (`.` 及一切未识别符号)
    NoTransition,
}

impl Beat {
    /// 由节拍图字符解析切换类型
    pub fn from_symbol(symbol: char) -> Beat {
        match symbol {
            'x' => Beat::VerticalBlur,
            'o' => Beat::HorizontalBlur,
            '-' => Beat::NoBlur,
            '+' => Beat::Blackout,
            '|' => Beat::ShortBlackout,
            ':' => Beat::ColorOnly,
            '*' => Beat::ImageOnly,
            _ => Beat::NoTransition,
        }
    }

    /// 该切换是否需要更换图像
    pub fn changes_image(self) -> bool {
        !matches!(self, Beat::NoTransition | Beat::ColorOnly)
    }

    /// 该切换是否需要更换颜色
    pub fn changes_color(self) -> bool {
        !matches!(self, Beat::NoTransition | Beat::ImageOnly)
    }
}

/// 图像对齐方式 (宽高比不匹配时的摆放位置)
///
/// 核心只透传该标签, 不参与合成运算.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    /// 由清单中的对齐名称解析, 未识别的名称回退为居中
    pub fn from_name(name: &str) -> Alignment {
        match name {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::Center,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_节拍字符映射() {
        assert_eq!(Beat::from_symbol('x'), Beat::VerticalBlur);
        assert_eq!(Beat::from_symbol('o'), Beat::HorizontalBlur);
        assert_eq!(Beat::from_symbol('-'), Beat::NoBlur);
        assert_eq!(Beat::from_symbol('+'), Beat::Blackout);
        assert_eq!(Beat::from_symbol('|'), Beat::ShortBlackout);
        assert_eq!(Beat::from_symbol(':'), Beat::ColorOnly);
        assert_eq!(Beat::from_symbol('*'), Beat::ImageOnly);
        assert_eq!(Beat::from_symbol('.'), Beat::NoTransition);
    }

    #[test]
    fn test_未识别符号不致命() {
        assert_eq!(Beat::from_symbol('?'), Beat::NoTransition);
        assert_eq!(Beat::from_symbol('国'), Beat::NoTransition);
    }

    #[test]
    fn test_切换分类() {
        assert!(Beat::VerticalBlur.changes_image());
        assert!(Beat::VerticalBlur.changes_color());
        assert!(!Beat::ImageOnly.changes_color());
        assert!(!Beat::ColorOnly.changes_image());
        assert!(!Beat::NoTransition.changes_image());
        assert!(!Beat::NoTransition.changes_color());
    }

    #[test]
    fn test_对齐名称解析() {
        assert_eq!(Alignment::from_name("left"), Alignment::Left);
        assert_eq!(Alignment::from_name("right"), Alignment::Right);
        assert_eq!(Alignment::from_name("center"), Alignment::Center);
        assert_eq!(Alignment::from_name("到处"), Alignment::Center);
        assert_eq!(Alignment::from_name(""), Alignment::Center);
    }
}
