mod chat_vm;

pub use chat_vm::{
    AiBadge, AiCardVm, ChatIntent, ChatVm, QUEST_MEANING_PREFIX, QUEST_TIP, TurnCardVm, clip_data_uri,
    clip_dom_id, map_chat,
};
