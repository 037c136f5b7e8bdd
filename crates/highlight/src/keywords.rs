use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 預設關鍵字。 / Built-in CH+ keywords and library function names.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "定义", "如果", "否则", "否则如果", "当", "对于", "返回",
    "控制台输出", "控制台输入", "控制台换行", "输出", "输入", "导入", "系统命令行", "空类型",
    "整型", "字符串", "小数", "布尔型", "字符型", "结构体", "主函数",
    "真", "假", "空", "退出循环", "下一层循环", "或", "或者", "json",
    "幂", "最大值", "最小值", "绝对值", "平方根", "正弦", "余弦", "正切",
    "获取当前工作目录", "切换工作目录", "获取环境变量值", "设置环境变量", "删除环境变量",
    "列出目录内容", "创建目录", "递归创建目录", "删除文件", "删除目录", "递归删除目录",
    "重命名文件", "获取文件状态", "路径是否存在", "是否为文件", "是否为目录",
    "执行系统命令", "执行命令并获取输出", "连接路径", "获取绝对路径", "获取文件名",
    "获取目录名", "分割路径", "分割文件名和扩展名",
    "获取操作系统名称", "获取操作系统版本", "获取系统架构", "获取系统语言",
    "是Windows系统", "是Linux系统", "是macOS系统", "读取剪贴板文本",
    "写入剪贴板文本", "清空剪贴板", "剪贴板中有文本", "获取用户环境变量",
    "获取用户主目录", "获取临时目录", "获取系统信息摘要", "显示系统信息",
    "HTTP发送请求", "HTTP获取请求", "解析主机名", "创建套接字", "连接服务器",
    "发送数据", "接收数据", "关闭套接字", "URL编码", "URL解码",
    "分配内存", "释放内存", "复制内存", "设置内存", "比较内存", "移动内存",
    "读取注册表值", "写入注册表值", "删除注册表键", "注册表键是否存在", "枚举注册表键",
];

const DEFAULT_DOCUMENTATION: &[(&str, &str)] = &[
    ("定义", "定义变量或常量。\n\n语法：定义(类型) 变量名 = 值;\n\n示例：定义(整型) x = 10;"),
    ("如果", "条件判断。\n\n语法：如果 (条件) {\n    ...\n} 否则 {\n    ...\n}\n\n示例：如果 (x > 0) {\n    控制台输出(\"x是正数\");\n}"),
    ("否则", "与如果配合，条件为假时执行。\n\n语法：如果 (条件) { ... } 否则 { ... }"),
    ("否则如果", "与如果配合的多分支判断。\n\n语法：如果 (条件1) { ... } 否则如果 (条件2) { ... } 否则 { ... }"),
    ("当", "条件为真时重复执行。\n\n语法：当 (条件) {\n    ...\n}\n\n示例：当 (i < 10) {\n    i = i + 1;\n}"),
    ("对于", "带初始化、条件和更新的循环。\n\n语法：对于 (初始化; 条件; 更新) { ... }\n\n示例：对于 (i = 0; i < 10; i = i + 1) {\n    控制台输出(i);\n}"),
    ("返回", "从函数返回值。\n\n语法：返回 值;\n\n示例：返回 x + y;"),
    ("控制台输出", "向控制台输出内容。\n\n语法：控制台输出(表达式);\n\n示例：控制台输出(\"Hello World!\");"),
    ("控制台输入", "从控制台读取输入。\n\n语法：控制台输入(变量名);"),
    ("控制台换行", "向控制台输出换行符。\n\n语法：控制台换行;"),
    ("输出", "控制台输出的简写。\n\n语法：输出(表达式);"),
    ("输入", "控制台输入的简写。\n\n语法：输入(变量名);"),
    ("导入", "导入其他 CH+ 文件。\n\n语法：导入 \"文件名.ch\";\n\n示例：导入 \"math.ch\";"),
    ("系统命令行", "执行系统命令。\n\n语法：系统命令行 \"命令\";\n\n示例：系统命令行 \"dir\";"),
    ("空类型", "函数没有返回值时使用的类型。\n\n语法：空类型 函数名() { ... }"),
    ("整型", "整数类型。\n\n示例：定义(整型) x = 10;"),
    ("字符串", "文本类型。\n\n示例：定义(字符串) s = \"你好\";"),
    ("小数", "浮点数类型。\n\n示例：定义(小数) x = 3.14;"),
    ("布尔型", "布尔类型，取值真或假。\n\n示例：定义(布尔型) flag = 真;"),
    ("字符型", "单个字符类型。\n\n示例：定义(字符型) c = 'A';"),
    ("结构体", "定义自定义数据类型。\n\n语法：结构体 名称 {\n    成员类型 成员名;\n}"),
    ("真", "布尔真值。"),
    ("假", "布尔假值。"),
    ("退出循环", "立即结束当前循环。\n\n语法：退出循环;"),
    ("下一层循环", "跳过本次循环剩余部分，进入下一次循环。\n\n语法：下一层循环;"),
    ("主函数", "程序入口。\n\n语法：空类型 主函数() {\n    ...\n}"),
    ("或", "逻辑或。\n\n语法：条件1 或 条件2"),
    ("或者", "逻辑或的另一种写法。\n\n语法：条件1 或者 条件2"),
    ("json", "JSON 数据类型。\n\n示例：定义(json) data = json { \"name\": \"张三\" };"),
    ("幂", "计算幂次方。\n\n示例：幂(2, 3) // 返回 8"),
    ("最大值", "返回两个数中的较大者。\n\n示例：最大值(10, 20) // 返回 20"),
    ("最小值", "返回两个数中的较小者。\n\n示例：最小值(10, 20) // 返回 10"),
    ("绝对值", "计算绝对值。\n\n示例：绝对值(-42) // 返回 42"),
    ("平方根", "计算平方根。\n\n示例：平方根(16) // 返回 4"),
    ("正弦", "计算正弦值（弧度）。"),
    ("余弦", "计算余弦值（弧度）。"),
    ("正切", "计算正切值（弧度）。"),
    ("控制台输出()", "向控制台输出内容。\n\n参数：一个或多个表达式。\n\n示例：控制台输出(\"x = \", x);"),
    ("控制台输入()", "从控制台读取输入并存入变量。\n\n示例：控制台输入(name);"),
    ("控制台换行()", "输出一个换行符。"),
    ("系统命令行()", "执行指定的系统命令。\n\n示例：系统命令行 \"echo Hello\";"),
    ("文件写入", "将内容写入文件。\n\n示例：文件写入(\"test.txt\", \"Hello\");"),
    ("文件读取", "读取文件内容到变量。\n\n示例：文件读取(\"test.txt\", 文件内容);"),
    ("文件追加", "向文件追加内容。\n\n示例：文件追加(\"test.txt\", \"更多内容\");"),
    ("长度()", "返回字符串长度。\n\n示例：长度(\"Hello\") // 返回 5"),
    ("字符转整型()", "返回字符的 ASCII 码。\n\n示例：字符转整型('A') // 返回 65"),
    ("转小写()", "将字符串转为小写。需要导入 ch_Lib/string.ch。"),
    ("整数转字符串()", "将整数转为字符串。\n\n示例：整数转字符串(123) // 返回 \"123\""),
    ("获取当前工作目录()", "返回当前工作目录。需要导入 ch_Lib/系统.ch。"),
    ("切换工作目录(路径)", "切换到指定目录。需要导入 ch_Lib/系统.ch。"),
    ("获取环境变量值(键, 默认值)", "读取环境变量，不存在时返回默认值。"),
    ("路径是否存在(路径)", "检查路径是否存在，返回布尔型。"),
    ("获取操作系统名称()", "返回操作系统名称。"),
];

/// 自訂關鍵字與預設清單的合併方式。 / How a custom keyword list combines with the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    #[default]
    Extend,
    Replace,
}

/// 關鍵字集合與說明文件。 / Keyword table plus documentation used for tooltips and help.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
    documentation: HashMap<String, String>,
}

impl KeywordSet {
    /// 空集合。 / A set without keywords or documentation.
    pub fn new() -> Self {
        Self::default()
    }

    /// 內建關鍵字與說明。 / The built-in CH+ keyword set.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        for keyword in DEFAULT_KEYWORDS {
            set.insert(*keyword, None::<String>);
        }
        for (name, doc) in DEFAULT_DOCUMENTATION {
            set.documentation.insert((*name).to_string(), (*doc).to_string());
        }
        set
    }

    /// 依設定建立集合；取代模式下空清單會退回預設值。 / Builds the active set; an empty replacement falls back to the defaults.
    ///
    /// Entries are trimmed first, so a list of blank entries counts as empty.
    pub fn with_custom<S: AsRef<str>>(custom: &[S], mode: KeywordMode) -> Self {
        let custom: Vec<&str> = custom
            .iter()
            .map(|keyword| keyword.as_ref().trim())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        let mut set = Self::builtin();
        if mode == KeywordMode::Replace && !custom.is_empty() {
            set.keywords.clear();
        }
        for keyword in custom {
            set.insert(keyword, None::<String>);
        }
        set
    }

    /// 加入關鍵字（重複時忽略），可附帶說明。 / Adds a keyword once, optionally with documentation.
    pub fn insert(&mut self, keyword: impl Into<String>, documentation: Option<impl Into<String>>) {
        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return;
        }
        if let Some(doc) = documentation {
            self.documentation.insert(keyword.clone(), doc.into());
        }
        if !self.contains(&keyword) {
            self.keywords.push(keyword);
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|candidate| candidate == keyword)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// 查詢說明：先精確比對，再試去掉或補上 `()`。 / Looks up documentation by exact name, then with `()` removed or appended.
    pub fn documentation(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(doc) = self.documentation.get(name) {
            return Some(doc);
        }
        if let Some(bare) = name.strip_suffix("()") {
            if let Some(doc) = self.documentation.get(bare) {
                return Some(doc);
            }
        }
        self.documentation
            .get(&format!("{name}()"))
            .map(String::as_str)
    }
}
