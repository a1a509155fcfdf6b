//! Keyword tables consulted by the intent classifier.
//!
//! English tables are matched against lowercased Unicode words. Chinese and Korean tables are
//! matched as substrings because the query is not segmented; the scan consumes the longest entry
//! at each position, so an entry never counts again inside a longer one.

pub struct KeywordTable {
	pub visual: &'static [&'static str],
	pub speech: &'static [&'static str],
	/// Compounds that contain a keyword but carry no cue of their own.
	pub neutral: &'static [&'static str],
}

pub static EN: KeywordTable = KeywordTable { visual: EN_VISUAL, speech: EN_SPEECH, neutral: &[] };
pub static ZH: KeywordTable =
	KeywordTable { visual: ZH_VISUAL, speech: ZH_SPEECH, neutral: ZH_NEUTRAL };
pub static KO: KeywordTable =
	KeywordTable { visual: KO_VISUAL, speech: KO_SPEECH, neutral: KO_NEUTRAL };

const EN_VISUAL: &[&str] = &[
	// Colors and lighting.
	"red",
	"orange",
	"yellow",
	"green",
	"blue",
	"purple",
	"pink",
	"black",
	"white",
	"gray",
	"grey",
	"golden",
	"bright",
	"dark",
	"sunny",
	"neon",
	// Clothing and appearance.
	"wearing",
	"shirt",
	"dress",
	"jacket",
	"hat",
	"glasses",
	"uniform",
	"costume",
	"hair",
	"beard",
	// Objects.
	"car",
	"bike",
	"bicycle",
	"boat",
	"plane",
	"train",
	"dog",
	"cat",
	"horse",
	"bird",
	"tree",
	"flower",
	"phone",
	"laptop",
	"screen",
	"sign",
	"logo",
	"table",
	"chair",
	"cake",
	"ball",
	"guitar",
	"flag",
	// Settings.
	"beach",
	"ocean",
	"sea",
	"mountain",
	"forest",
	"street",
	"city",
	"building",
	"kitchen",
	"stage",
	"sky",
	"sunset",
	"sunrise",
	"snow",
	"rain",
	"fire",
	"night",
	"outdoor",
	"outdoors",
	"indoor",
	"crowd",
	// Actions.
	"running",
	"walking",
	"dancing",
	"jumping",
	"swimming",
	"driving",
	"riding",
	"holding",
	"smiling",
	"hugging",
	"waving",
	"playing",
	"cooking",
	"eating",
	"fighting",
	"sitting",
	"standing",
	// Shot vocabulary.
	"closeup",
	"aerial",
	"shot",
	"scene",
	"shows",
	"showing",
	"looks",
	"appears",
];

const EN_SPEECH: &[&str] = &[
	"say",
	"says",
	"said",
	"saying",
	"tell",
	"tells",
	"told",
	"ask",
	"asks",
	"asked",
	"mention",
	"mentions",
	"mentioned",
	"talk",
	"talks",
	"talking",
	"speak",
	"speaks",
	"spoke",
	"explain",
	"explains",
	"explained",
	"claim",
	"claims",
	"announce",
	"announces",
	"reply",
	"replies",
	"shout",
	"shouts",
	"whisper",
	"whispers",
	"quote",
	"quotes",
	"dialogue",
	"conversation",
	"interview",
	"discuss",
	"discusses",
	"discussion",
	"words",
];

const ZH_VISUAL: &[&str] = &[
	"红色",
	"橙色",
	"黄色",
	"绿色",
	"蓝色",
	"紫色",
	"粉色",
	"黑色",
	"白色",
	"灰色",
	"金色",
	"明亮",
	"昏暗",
	"穿着",
	"衣服",
	"裙子",
	"外套",
	"帽子",
	"眼镜",
	"头发",
	"汽车",
	"自行车",
	"船",
	"飞机",
	"火车",
	"狗",
	"猫",
	"骑马",
	"鸟",
	"树",
	"花朵",
	"鲜花",
	"手机",
	"电脑",
	"屏幕",
	"标志",
	"桌子",
	"椅子",
	"蛋糕",
	"吉他",
	"旗",
	"海滩",
	"大海",
	"山顶",
	"山上",
	"高山",
	"森林",
	"街道",
	"城市",
	"建筑",
	"厨房",
	"舞台",
	"天空",
	"日落",
	"日出",
	"下雪",
	"下雨",
	"火焰",
	"夜晚",
	"户外",
	"室内",
	"人群",
	"跑步",
	"走路",
	"跳舞",
	"跳跃",
	"游泳",
	"开车",
	"骑",
	"拿着",
	"微笑",
	"拥抱",
	"挥手",
	"做饭",
	"吃饭",
	"吃东西",
	"打架",
	"坐着",
	"站着",
	"特写",
	"航拍",
	"画面",
	"镜头",
];

const ZH_SPEECH: &[&str] = &[
	"说话",
	"说了",
	"说道",
	"说什么",
	"讲",
	"告诉",
	"问",
	"提到",
	"谈",
	"聊",
	"解释",
	"宣布",
	"回答",
	"喊",
	"低语",
	"台词",
	"对话",
	"采访",
	"讨论",
	"引用",
];

const ZH_NEUTRAL: &[&str] = &["小说", "问题", "学问", "马上", "花钱", "花费"];

const KO_VISUAL: &[&str] = &[
	"빨간",
	"파란",
	"노란",
	"초록",
	"검은",
	"하얀",
	"옷",
	"모자",
	"안경",
	"자동차",
	"자전거",
	"강아지",
	"고양이",
	"해변",
	"바다",
	"숲",
	"도시",
	"거리",
	"하늘",
	"노을",
	"일몰",
	"일출",
	"무대",
	"부엌",
	"춤",
	"춤추는",
	"달리는",
	"운전",
	"수영",
	"웃는",
	"장면",
];

const KO_SPEECH: &[&str] = &[
	"말하",
	"말했",
	"이야기",
	"대화",
	"인터뷰",
	"설명",
	"대답",
	"질문",
	"물어",
	"외치",
	"속삭",
	"대사",
	"언급",
	"토론",
];

const KO_NEUTRAL: &[&str] = &["옷장", "거리감"];
