//! 噪声整形抖动器.
//!
//! 把 28 位定点采样量化为低位宽 PCM, 同时用三阶误差反馈把量化噪声
//! 推向听觉不敏感的频段. 算法源自 madplay 的 audio_linear_dither.
//!
//! 给定相同的初始 PRNG 种子和输入序列, 输出逐字节一致 (测试依赖该性质).

/// 定点采样的小数位数
pub const FRAC_BITS: u32 = 28;

/// 定点值域上限 (含)
const FIXED_MAX: i32 = (1 << FRAC_BITS) - 1;
/// 定点值域下限
const FIXED_MIN: i32 = -(1 << FRAC_BITS);

/// 单声道抖动状态: 三项量化误差历史 + 线性同余发生器状态.
///
/// 一次解码调用期间存活, 解码外部不可读.
#[derive(Debug, Clone, Default)]
pub struct Dither {
    error: [i32; 3],
    prng_state: u32,
}

impl Dither {
    /// 创建零初始状态的抖动器
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定 PRNG 种子创建 (测试用确定性入口)
    pub fn with_seed(seed: u32) -> Self {
        Self {
            error: [0; 3],
            prng_state: seed,
        }
    }

    /// 线性同余伪随机数发生器
    #[inline]
    fn prng(state: u32) -> u32 {
        state.wrapping_mul(0x0019_660d).wrapping_add(0x3c6e_f35f)
    }

    /// 将一个定点采样量化到 `bits` 位, 返回量化后的有符号值.
    ///
    /// 步骤: 噪声整形 -> 舍入偏置 -> 混入抖动噪声 -> 裁剪 -> 掩码量化 ->
    /// 误差反馈 -> 右移到目标位宽. 裁剪发生时同步裁剪误差源,
    /// 避免饱和值污染误差反馈.
    pub fn update(&mut self, bits: u32, sample: i32) -> i32 {
        // 噪声整形
        let mut sample = sample
            .wrapping_add(self.error[0])
            .wrapping_sub(self.error[1])
            .wrapping_add(self.error[2]);

        self.error[2] = self.error[1];
        self.error[1] = self.error[0] / 2;

        // 舍入偏置
        let mut output = sample.wrapping_add(1 << (FRAC_BITS + 1 - bits - 1));

        let scalebits = FRAC_BITS + 1 - bits;
        let mask = (1i32 << scalebits) - 1;

        // 抖动
        let random = Self::prng(self.prng_state);
        output = output
            .wrapping_add(random as i32 & mask)
            .wrapping_sub(self.prng_state as i32 & mask);
        self.prng_state = random;

        // 裁剪
        if output > FIXED_MAX {
            output = FIXED_MAX;
            if sample > FIXED_MAX {
                sample = FIXED_MAX;
            }
        } else if output < FIXED_MIN {
            output = FIXED_MIN;
            if sample < FIXED_MIN {
                sample = FIXED_MIN;
            }
        }

        // 量化
        output &= !mask;

        // 误差反馈
        self.error[0] = sample - output;

        // 缩放到目标位宽
        output >> scalebits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_相同种子输出一致() {
        let input: Vec<i32> = (0..4096)
            .map(|i| ((i * 31 + 7) % 9973) * 26861 - (1 << 27))
            .collect();

        let mut a = Dither::with_seed(0xdead_beef);
        let mut b = Dither::with_seed(0xdead_beef);
        for &s in &input {
            assert_eq!(a.update(16, s), b.update(16, s));
        }
    }

    #[test]
    fn test_不同种子输出不同() {
        let input: Vec<i32> = (0..256).map(|i| i * 1_000_000).collect();
        let out_a: Vec<i32> = {
            let mut d = Dither::with_seed(1);
            input.iter().map(|&s| d.update(16, s)).collect()
        };
        let out_b: Vec<i32> = {
            let mut d = Dither::with_seed(2);
            input.iter().map(|&s| d.update(16, s)).collect()
        };
        assert_ne!(out_a, out_b);
    }

    #[test]
    fn test_输出在16位范围内() {
        let mut d = Dither::new();
        for s in [FIXED_MIN, -1, 0, 1, FIXED_MAX, FIXED_MAX / 2, FIXED_MIN / 2] {
            for _ in 0..64 {
                let out = d.update(16, s);
                assert!((i16::MIN as i32..=i16::MAX as i32).contains(&out));
            }
        }
    }

    #[test]
    fn test_静音输入近似零输出() {
        let mut d = Dither::new();
        for _ in 0..1024 {
            let out = d.update(16, 0);
            // 误差反馈有界: 静音输入的抖动输出只在最低几位抖动
            assert!(out.abs() <= 4, "静音样本抖动后 |{out}| > 4");
        }
    }

    #[test]
    fn test_饱和裁剪() {
        let mut d = Dither::new();
        let out = d.update(16, i32::MAX / 2);
        assert_eq!(out, i16::MAX as i32);
        let out = d.update(16, i32::MIN / 2);
        assert_eq!(out, i16::MIN as i32);
    }
}
